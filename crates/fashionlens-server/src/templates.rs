//! HTML pages for the upload form and results

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; background: #f6f6f4; color: #222; margin: 0; }
    main { max-width: 40rem; margin: 3rem auto; padding: 2rem; background: #fff; border-radius: 8px; }
    h1 { margin-top: 0; }
    .flash { background: #fde8e8; color: #9b1c1c; padding: 0.75rem 1rem; border-radius: 4px; }
    .label { font-size: 1.5rem; font-weight: 600; }
    img { max-width: 100%; border-radius: 4px; margin-top: 1rem; }
"#;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn upload_form() -> &'static str {
    r#"<form method="post" action="/" enctype="multipart/form-data">
    <input type="file" name="file" accept="image/*">
    <input type="submit" value="Upload">
</form>"#
}

/// Upload form, with an optional message from a rejected submission
pub fn index(message: Option<&str>) -> String {
    let flash = message
        .map(|m| format!(r#"<p class="flash">{}</p>"#, escape(m)))
        .unwrap_or_default();

    page(
        "fashionlens",
        &format!(
            "<h1>Upload a product photo</h1>\n{}\n{}",
            flash,
            upload_form()
        ),
    )
}

/// Classification result for a stored upload
pub fn results(name: &str, label: &str) -> String {
    let name = escape(name);
    page(
        "fashionlens - result",
        &format!(
            r#"<h1>Result</h1>
<p class="label">{label}</p>
<img src="/uploads/{name}" alt="{name}">
<p><a href="/">Classify another photo</a></p>"#,
            label = escape(label),
        ),
    )
}

/// The upload form again after a stored file could not be classified
pub fn results_error(message: &str) -> String {
    page(
        "fashionlens - error",
        &format!(
            r#"<h1>Could not classify this image</h1>
<p class="flash">{}</p>
<p>Please upload another photo.</p>
{}"#,
            escape(message),
            upload_form()
        ),
    )
}

/// Minimal HTML escaping for text and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
