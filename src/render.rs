//! Minimal HTML rendition of the portal pages.
//!
//! Records from the API are opaque JSON; tables pick cells out of them by dotted key
//! paths (`"property.name"`) and never reinterpret the data.

use std::fmt::Write;

use chrono::Timelike;
use serde_json::Value;

use crate::{
    nav::visible_links,
    session::{Session, Theme},
    views::View,
};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Time-of-day greeting shown as the dashboard title.
pub fn greeting(hour: u32, name: &str) -> String {
    let period = match hour {
        5..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    };
    let name = if name.trim().is_empty() { "there" } else { name };
    format!("{period}, {name}")
}

pub fn greeting_now(name: &str) -> String {
    greeting(chrono::Local::now().hour(), name)
}

/// Flash
///
/// Inline feedback for the last action on a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl Flash {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            error: Some(msg.into()),
            message: None,
        }
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self {
            error: None,
            message: Some(msg.into()),
        }
    }

    /// `Ok` becomes a success message, `Err` an error.
    pub fn from_outcome(outcome: Result<String, String>) -> Self {
        match outcome {
            Ok(msg) => Self::message(msg),
            Err(msg) => Self::error(msg),
        }
    }

    fn html(&self) -> String {
        let mut out = String::new();
        if let Some(err) = &self.error {
            let _ = write!(out, r#"<p class="error">{}</p>"#, escape(err));
        }
        if let Some(msg) = &self.message {
            let _ = write!(out, r#"<p class="success">{}</p>"#, escape(msg));
        }
        out
    }
}

fn document(theme: Theme, title: &str, body: &str) -> String {
    let class = match theme {
        Theme::Dark => "theme-dark",
        Theme::Light => "theme-light",
    };
    format!(
        concat!(
            "<!DOCTYPE html>\n<html class=\"{class}\"><head><meta charset=\"utf-8\">",
            "<title>{title} · KRIB</title></head><body>{body}</body></html>"
        ),
        class = class,
        title = escape(title),
        body = body,
    )
}

/// layout
///
/// Wraps a protected page: role-scoped sidebar, theme and logout controls, title bar,
/// inline feedback, then the page body.
pub fn layout(
    view: View,
    session: &Session,
    theme: Theme,
    flash: &Flash,
    body: &str,
) -> String {
    let title = if view.is_home() {
        greeting_now(&session.username)
    } else {
        view.title().to_string()
    };

    let mut nav = String::new();
    for link in visible_links(Some(session.role)) {
        let active = if link.path == view.path() { " active" } else { "" };
        let _ = write!(
            nav,
            r#"<a class="sidebar-link{active}" href="{}">{}</a>"#,
            escape(&link.path),
            escape(&link.label)
        );
    }

    let theme_label = match theme {
        Theme::Dark => "Light mode",
        Theme::Light => "Dark mode",
    };

    let page = format!(
        concat!(
            r#"<aside class="app-sidebar"><a class="sidebar-brand" href="{home}">KRIB</a>"#,
            r#"<p class="sidebar-role">{role} workspace</p><nav class="sidebar-nav">{nav}</nav>"#,
            r#"<form method="post" action="/theme"><button class="btn-muted">{theme_label}</button></form>"#,
            r#"<form method="post" action="/logout"><button class="btn-secondary">Logout</button></form>"#,
            r#"</aside><div class="layout-main"><header class="topbar"><h1>{title}</h1>"#,
            r#"<p class="subtitle">{subtitle}</p></header><main class="page-content">{flash}{body}</main></div>"#,
        ),
        home = session.role.home().path(),
        role = session.role,
        nav = nav,
        theme_label = theme_label,
        title = escape(&title),
        subtitle = escape(view.subtitle()),
        flash = flash.html(),
        body = body,
    );
    document(theme, view.title(), &page)
}

pub fn login_page(theme: Theme, username: &str, error: Option<&str>) -> String {
    let flash = Flash {
        error: error.map(str::to_string),
        message: None,
    };
    let form = Form::new(View::Login.path(), "Login")
        .field(Field::text("username", "Username", username).required())
        .field(Field::password("password", "Password").required());
    let body = format!(
        r#"<div class="login-card"><h2>Welcome to <span class="brand">KRIB</span></h2><p class="subtitle">{}</p>{}{}</div>"#,
        View::Login.subtitle(),
        flash.html(),
        form.html()
    );
    document(theme, View::Login.title(), &body)
}

/// Page for public flows (invite acceptance) that have no sidebar.
pub fn public_page(theme: Theme, view: View, flash: &Flash, body: &str) -> String {
    let page = format!(
        r#"<div class="card"><h2>{}</h2>{}{}</div>"#,
        escape(view.title()),
        flash.html(),
        body
    );
    document(theme, view.title(), &page)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"<div class="card"><p class="error">{}</p><a href="{}">Back to login</a></div>"#,
        escape(message),
        View::Login.path()
    );
    document(Theme::Dark, "Error", &body)
}

pub fn card(heading: &str, inner: &str) -> String {
    format!(r#"<div class="card"><h3>{}</h3>{}</div>"#, escape(heading), inner)
}

pub fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", escape(text))
}

// --- Opaque record helpers ---

/// value_at
///
/// Follows a dotted key path through nested objects.
pub fn value_at<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Display form of a JSON scalar; missing values render as `-`.
pub fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) if s.is_empty() => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn text_at(record: &Value, path: &str) -> String {
    display(value_at(record, path))
}

/// Amount with two decimals. The API sends decimals as strings or numbers; anything
/// unreadable counts as zero.
pub fn money(value: Option<&Value>) -> String {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    format!("{amount:.2}")
}

pub fn records(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// table
///
/// Renders an array of records with one column per `(header, key path)` pair.
/// Anything that is not an array renders as the `empty` text.
pub fn table(rows: &Value, columns: &[(&str, &str)], empty: &str) -> String {
    let rows = records(rows);
    if rows.is_empty() {
        return paragraph(empty);
    }

    let mut out = String::from("<table><thead><tr>");
    for (header, _) in columns {
        let _ = write!(out, "<th>{}</th>", escape(header));
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for (_, path) in columns {
            let _ = write!(out, "<td>{}</td>", escape(&text_at(row, path)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// `(value, label)` pairs for a `<select>` built from records.
pub fn options_from(rows: &Value, value_path: &str, label_paths: &[&str]) -> Vec<(String, String)> {
    records(rows)
        .iter()
        .map(|row| {
            let label = label_paths
                .iter()
                .map(|path| text_at(row, path))
                .collect::<Vec<_>>()
                .join(" / ");
            (text_at(row, value_path), label)
        })
        .collect()
}

// --- Forms ---

#[derive(Debug, Clone)]
enum Input {
    Text(&'static str),
    TextArea,
    Select(Vec<(String, String)>),
    Hidden,
}

/// Field
///
/// One form control.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    label: String,
    value: String,
    required: bool,
    input: Input,
}

impl Field {
    fn new(name: &str, label: &str, value: &str, input: Input) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            required: false,
            input,
        }
    }

    pub fn text(name: &str, label: &str, value: &str) -> Self {
        Self::new(name, label, value, Input::Text("text"))
    }

    pub fn password(name: &str, label: &str) -> Self {
        Self::new(name, label, "", Input::Text("password"))
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::new(name, label, "", Input::Text("date"))
    }

    pub fn datetime(name: &str, label: &str) -> Self {
        Self::new(name, label, "", Input::Text("datetime-local"))
    }

    pub fn textarea(name: &str, label: &str) -> Self {
        Self::new(name, label, "", Input::TextArea)
    }

    pub fn hidden(name: &str, value: &str) -> Self {
        Self::new(name, "", value, Input::Hidden)
    }

    /// A select whose first option is an empty placeholder labelled `label`.
    pub fn select(name: &str, label: &str, options: Vec<(String, String)>) -> Self {
        Self::new(name, label, "", Input::Select(options))
    }

    pub fn selected(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn html(&self) -> String {
        let name = escape(&self.name);
        let label = escape(&self.label);
        let value = escape(&self.value);
        let required = if self.required { " required" } else { "" };
        match &self.input {
            Input::Text(kind) => format!(
                r#"<input type="{kind}" name="{name}" placeholder="{label}" value="{value}"{required}>"#
            ),
            Input::TextArea => format!(
                r#"<textarea name="{name}" placeholder="{label}"{required}>{value}</textarea>"#
            ),
            Input::Hidden => format!(r#"<input type="hidden" name="{name}" value="{value}">"#),
            Input::Select(options) => {
                let mut out = format!(r#"<select name="{name}"{required}>"#);
                if !self.label.is_empty() {
                    let _ = write!(out, r#"<option value="">{label}</option>"#);
                }
                for (opt_value, opt_label) in options {
                    let selected = if *opt_value == self.value { " selected" } else { "" };
                    let _ = write!(
                        out,
                        r#"<option value="{}"{selected}>{}</option>"#,
                        escape(opt_value),
                        escape(opt_label)
                    );
                }
                out.push_str("</select>");
                out
            }
        }
    }
}

/// Form
///
/// A POST form built from fields.
#[derive(Debug, Clone)]
pub struct Form {
    action: String,
    submit: String,
    fields: Vec<Field>,
}

impl Form {
    pub fn new(action: &str, submit: &str) -> Self {
        Self {
            action: action.to_string(),
            submit: submit.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn html(&self) -> String {
        let fields: String = self.fields.iter().map(Field::html).collect();
        format!(
            r#"<form method="post" action="{}">{}<button type="submit">{}</button></form>"#,
            escape(&self.action),
            fields,
            escape(&self.submit)
        )
    }
}
