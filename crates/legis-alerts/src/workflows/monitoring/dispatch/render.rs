//! Renderers turning a [`Message`] into channel payloads.

use std::fmt;

use super::message::{Block, Branding, Message};

/// Telegram-flavoured HTML (`parse_mode=HTML`): only inline tags, newlines for layout.
pub struct RichText<'a>(pub &'a Message);

impl fmt::Display for RichText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.0;
        write!(f, "{} <b>{}</b>", message.icon, escape_html(&message.title))?;

        for section in &message.sections {
            f.write_str("\n")?;
            for block in &section.blocks {
                f.write_str("\n")?;
                match block {
                    Block::Heading(text) => write!(f, "<b>{}</b>", escape_html(text))?,
                    Block::Emphasis(text) => write!(f, "<i>{}</i>", escape_html(text))?,
                    Block::Text(text) => f.write_str(&escape_html(text))?,
                    Block::Field { label, value } => {
                        write!(f, "<b>{}:</b> {}", escape_html(label), escape_html(value))?
                    }
                    Block::Bullet(text) => write!(f, "• {}", escape_html(text))?,
                }
            }
        }

        if !message.links.is_empty() {
            f.write_str("\n")?;
            for link in &message.links {
                write!(
                    f,
                    "\n{} <a href=\"{}\">{}</a>",
                    link.icon,
                    escape_html(&link.url),
                    escape_html(&link.label)
                )?;
            }
        }
        Ok(())
    }
}

/// Plain-text alternative for e-mail clients and logs.
pub struct PlainText<'a>(pub &'a Message);

impl fmt::Display for PlainText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.0;
        write!(f, "{} {}", message.icon, message.title)?;

        for section in &message.sections {
            f.write_str("\n")?;
            for block in &section.blocks {
                f.write_str("\n")?;
                match block {
                    Block::Heading(text) | Block::Emphasis(text) | Block::Text(text) => {
                        f.write_str(text)?
                    }
                    Block::Field { label, value } => write!(f, "{label}: {value}")?,
                    Block::Bullet(text) => write!(f, "• {text}")?,
                }
            }
        }

        if !message.links.is_empty() {
            f.write_str("\n")?;
            for link in &message.links {
                write!(f, "\n{}: {}", link.label, link.url)?;
            }
        }
        Ok(())
    }
}

pub fn render_rich(message: &Message) -> String {
    RichText(message).to_string()
}

pub fn render_plain(message: &Message) -> String {
    PlainText(message).to_string()
}

/// Standalone HTML e-mail wrapping the rich body in a branded card.
pub struct EmailCard<'a> {
    pub message: &'a Message,
    pub branding: &'a Branding,
}

impl fmt::Display for EmailCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (message, branding) = (self.message, self.branding);
        let body = render_rich(message).replace('\n', "<br>\n");

        writeln!(f, "<!doctype html>")?;
        writeln!(f, "<html>")?;
        writeln!(
            f,
            "<head><meta charset=\"utf-8\"><title>{}</title></head>",
            escape_html(&message.subject)
        )?;
        writeln!(
            f,
            "<body style=\"margin:0;padding:0;background:#f2f4f7;font-family:Arial,Helvetica,sans-serif;\">"
        )?;
        writeln!(
            f,
            "<table width=\"100%\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#f2f4f7;padding:24px 0;\"><tr><td align=\"center\">"
        )?;
        writeln!(
            f,
            "<table width=\"640\" cellpadding=\"0\" cellspacing=\"0\" style=\"background:#ffffff;border-radius:10px;overflow:hidden;border:1px solid #e6e9ef;\">"
        )?;
        writeln!(
            f,
            "<tr><td style=\"background:#1a365d;color:#fff;padding:18px 22px;\"><div style=\"font-size:16px;font-weight:700;\">{}</div><div style=\"font-size:12px;opacity:.9;margin-top:4px;\">Notificação automática</div></td></tr>",
            escape_html(&branding.name)
        )?;
        writeln!(
            f,
            "<tr><td style=\"padding:18px 22px;color:#111;font-size:14px;line-height:1.45;\">"
        )?;
        writeln!(f, "{body}")?;

        if let Some(panel_url) = &branding.panel_url {
            let url = escape_html(panel_url);
            writeln!(
                f,
                "<div style=\"margin-top:18px;text-align:center;\"><a href=\"{url}\" style=\"display:inline-block;background:#2f7d32;color:#fff;text-decoration:none;padding:10px 18px;border-radius:8px;font-weight:700;\">🖥️ Abrir Painel</a></div>"
            )?;
            writeln!(f, "</td></tr>")?;
            writeln!(
                f,
                "<tr><td style=\"background:#f8f9fb;padding:14px 22px;color:#6b7280;font-size:12px;text-align:center;border-top:1px solid #eef0f4;\">Painel: <a href=\"{url}\" style=\"color:#1a365d;text-decoration:none;\">{url}</a></td></tr>"
            )?;
        } else {
            writeln!(f, "</td></tr>")?;
        }

        writeln!(f, "</table>")?;
        writeln!(f, "</td></tr></table>")?;
        writeln!(f, "</body>")?;
        writeln!(f, "</html>")?;
        Ok(())
    }
}

pub fn render_email_html(message: &Message, branding: &Branding) -> String {
    EmailCard { message, branding }.to_string()
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
