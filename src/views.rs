//! Inline HTML views. Deliberately thin: string assembly with escaping,
//! one function per page.

use axum::http::StatusCode;

use crate::table::Table;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
         <title>{title} – salescast</title></head>\n<body>\n{body}\n</body></html>",
        title = escape(title),
        body = body
    )
}

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(msg) => format!("<p class=\"error\">{}</p>", escape(msg)),
        None => String::new(),
    }
}

pub fn index_page() -> String {
    layout(
        "Welcome",
        "<h1>salescast</h1>\
         <p>Upload sales spreadsheets and get demand predictions.</p>\
         <p><a href=\"/register\">Register</a> | <a href=\"/login\">Login</a></p>",
    )
}

pub fn register_page(error: Option<&str>) -> String {
    let body = format!(
        "<h1>Register</h1>{banner}\
         <form method=\"post\" action=\"/register\">\
         <label>Name <input name=\"name\"></label><br>\
         <label>Email <input name=\"email\" type=\"email\"></label><br>\
         <label>Password <input name=\"password\" type=\"password\"></label><br>\
         <button type=\"submit\">Register</button>\
         </form>\
         <p><a href=\"/login\">Already registered? Login</a></p>",
        banner = error_banner(error)
    );
    layout("Register", &body)
}

pub fn login_page(error: Option<&str>) -> String {
    let body = format!(
        "<h1>Login</h1>{banner}\
         <form method=\"post\" action=\"/login\">\
         <label>Email <input name=\"email\" type=\"email\"></label><br>\
         <label>Password <input name=\"password\" type=\"password\"></label><br>\
         <button type=\"submit\">Login</button>\
         </form>\
         <p><a href=\"/register\">Need an account? Register</a></p>",
        banner = error_banner(error)
    );
    layout("Login", &body)
}

pub fn dashboard_page(name: &str, email: &str, flash: Option<&str>) -> String {
    let flash = match flash {
        Some(msg) => format!("<p class=\"flash\">{}</p>", escape(msg)),
        None => String::new(),
    };
    let body = format!(
        "<h1>Dashboard</h1>{flash}\
         <p>Signed in as {name} ({email})</p>\
         <ul>\
         <li><a href=\"/upload\">Upload spreadsheet</a></li>\
         <li><a href=\"/single_prediction\">Single prediction</a></li>\
         <li><a href=\"/bulk_prediction\">Bulk prediction</a></li>\
         <li><a href=\"/logout\">Logout</a></li>\
         </ul>",
        flash = flash,
        name = escape(name),
        email = escape(email),
    );
    layout("Dashboard", &body)
}

pub fn upload_page(error: Option<&str>) -> String {
    let body = format!(
        "<h1>Upload spreadsheet</h1>{banner}\
         <form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"file\" accept=\".xlsx,.xls\">\
         <button type=\"submit\">Upload</button>\
         </form>\
         <p><a href=\"/dashboard\">Back</a></p>",
        banner = error_banner(error)
    );
    layout("Upload", &body)
}

const SINGLE_FIELDS: [(&str, &str); 10] = [
    ("product_category", "Product category"),
    ("item_id", "Item id"),
    ("season", "Season"),
    ("item_price", "Item price"),
    ("promotion", "Promotion (0/1)"),
    ("competitor_activity", "Competitor activity (0/1)"),
    ("year", "Year"),
    ("month", "Month"),
    ("day", "Day"),
    ("day_of_week", "Day of week"),
];

pub fn single_prediction_page(prediction: Option<f64>, error: Option<&str>) -> String {
    let result = match prediction {
        Some(value) => format!("<p class=\"result\">Predicted sales: <b>{value:.2}</b></p>"),
        None => String::new(),
    };
    let mut inputs = String::new();
    for (name, label) in SINGLE_FIELDS {
        inputs.push_str(&format!(
            "<label>{label} <input name=\"{name}\"></label><br>"
        ));
    }
    let body = format!(
        "<h1>Single prediction</h1>{banner}{result}\
         <form method=\"post\" action=\"/single_prediction\">{inputs}\
         <button type=\"submit\">Predict</button>\
         </form>\
         <p><a href=\"/dashboard\">Back</a></p>",
        banner = error_banner(error),
    );
    layout("Single prediction", &body)
}

pub fn bulk_prediction_page(table: Option<&Table>, error: Option<&str>) -> String {
    let rendered = match table {
        Some(t) => render_table(t),
        None => String::new(),
    };
    let body = format!(
        "<h1>Bulk prediction</h1>{banner}\
         <form method=\"post\" action=\"/bulk_prediction\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"file\" accept=\".xlsx,.xls\">\
         <button type=\"submit\">Predict</button>\
         </form>\
         {rendered}\
         <p><a href=\"/dashboard\">Back</a></p>",
        banner = error_banner(error),
    );
    layout("Bulk prediction", &body)
}

fn render_table(table: &Table) -> String {
    let mut html = String::from("<table class=\"data\" border=\"1\"><thead><tr>");
    for col in table.columns() {
        html.push_str(&format!("<th>{}</th>", escape(col)));
    }
    html.push_str("</tr></thead><tbody>");
    for r in 0..table.n_rows() {
        html.push_str("<tr>");
        for c in 0..table.columns().len() {
            html.push_str(&format!("<td>{}</td>", escape(&table.cell(r, c).display())));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{status}</h1><p>{message}</p><p><a href=\"/dashboard\">Back to dashboard</a></p>",
        status = status,
        message = escape(message),
    );
    layout("Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<script>\"&'</script>"),
            "&lt;script&gt;&quot;&amp;&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn table_renders_all_cells_escaped() {
        let t = Table::new(
            vec!["item".into(), "Prediction".into()],
            vec![vec![Cell::Text("<b>I1</b>".into()), Cell::Float(12.5)]],
        );
        let html = render_table(&t);
        assert!(html.contains("<th>item</th>"));
        assert!(html.contains("<th>Prediction</th>"));
        assert!(html.contains("&lt;b&gt;I1&lt;/b&gt;"));
        assert!(html.contains("<td>12.5</td>"));
    }

    #[test]
    fn login_page_shows_error_banner() {
        let html = login_page(Some("invalid email or password"));
        assert!(html.contains("invalid email or password"));
        assert!(login_page(None).contains("<form"));
    }

    #[test]
    fn single_form_has_all_ten_fields() {
        let html = single_prediction_page(None, None);
        for (name, _) in SINGLE_FIELDS {
            assert!(html.contains(&format!("name=\"{name}\"")), "{name}");
        }
    }
}
