//! Email bodies, rendered with `minijinja`.
//!
//! Each email has a plain-text and an HTML template registered under
//! `<name>.txt` / `<name>.html`. The methods on [`Templates`] fill them in and
//! return a ready-to-send [`Email`].

use minijinja::{Environment, context};

use super::{Email, SendError};

const LAYOUT_HTML: &str = r#"<!doctype html>
<html>
<body style="font-family: sans-serif; color: #222; max-width: 600px; margin: 0 auto;">
{% block body %}{% endblock %}
<p style="color: #888; font-size: 12px;">{{ site_name }}</p>
</body>
</html>
"#;

const TEMPLATES: &[(&str, &str)] = &[
    (
        "message_notification.txt",
        "Hi {{ recipient }},\n\n\
         {{ sender }} sent you a new message:\n\n\
         {{ preview }}\n\n\
         Reply here: {{ chat_url }}\n\n\
         You can turn these emails off in your profile settings.\n",
    ),
    (
        "message_notification.html",
        r#"{% extends "layout.html" %}{% block body %}
<p>Hi {{ recipient }},</p>
<p><strong>{{ sender }}</strong> sent you a new message:</p>
<blockquote style="border-left: 3px solid #ccc; padding-left: 12px;">{{ preview }}</blockquote>
<p><a href="{{ chat_url }}">Open the conversation</a></p>
<p style="font-size: 12px;">You can turn these emails off in your profile settings.</p>
{% endblock %}"#,
    ),
    (
        "verify_email.txt",
        "Hi {{ name }},\n\n\
         Thanks for signing up to {{ site_name }}. Confirm your email address by opening:\n\n\
         {{ verify_url }}\n\n\
         If you did not create this account you can ignore this email.\n",
    ),
    (
        "verify_email.html",
        r#"{% extends "layout.html" %}{% block body %}
<p>Hi {{ name }},</p>
<p>Thanks for signing up to {{ site_name }}. Confirm your email address:</p>
<p><a href="{{ verify_url }}">Verify my email</a></p>
<p>If you did not create this account you can ignore this email.</p>
{% endblock %}"#,
    ),
    (
        "verification_success.txt",
        "Hi {{ name }},\n\nYour email address is verified. Welcome to {{ site_name }}!\n\n{{ site_url }}\n",
    ),
    (
        "verification_success.html",
        r#"{% extends "layout.html" %}{% block body %}
<p>Hi {{ name }},</p>
<p>Your email address is verified. Welcome to <a href="{{ site_url }}">{{ site_name }}</a>!</p>
{% endblock %}"#,
    ),
    (
        "password_reset.txt",
        "Hi {{ name }},\n\n\
         Someone asked to reset the password for your {{ site_name }} account. \
         Use this link within {{ ttl_hours }} hours:\n\n\
         {{ reset_url }}\n\n\
         If this wasn't you, ignore this email; your password stays the same.\n",
    ),
    (
        "password_reset.html",
        r#"{% extends "layout.html" %}{% block body %}
<p>Hi {{ name }},</p>
<p>Someone asked to reset the password for your {{ site_name }} account.
The link below works for {{ ttl_hours }} hours.</p>
<p><a href="{{ reset_url }}">Reset my password</a></p>
<p>If this wasn't you, ignore this email; your password stays the same.</p>
{% endblock %}"#,
    ),
    (
        "password_reset_success.txt",
        "Hi {{ name }},\n\n\
         Your {{ site_name }} password was changed and every signed-in session was logged out.\n\
         If you did not do this, reset your password again right away.\n",
    ),
    (
        "password_reset_success.html",
        r#"{% extends "layout.html" %}{% block body %}
<p>Hi {{ name }},</p>
<p>Your {{ site_name }} password was changed and every signed-in session was logged out.</p>
<p>If you did not do this, reset your password again right away.</p>
{% endblock %}"#,
    ),
    (
        "contact_notice.txt",
        "New contact form submission on {{ site_name }}\n\n\
         From: {{ name }} <{{ email }}>\n\
         Subject: {{ subject }}\n\n\
         {{ message }}\n",
    ),
    (
        "contact_notice.html",
        r#"{% extends "layout.html" %}{% block body %}
<h3>New contact form submission</h3>
<p><strong>From:</strong> {{ name }} &lt;{{ email }}&gt;<br>
<strong>Subject:</strong> {{ subject }}</p>
<p style="white-space: pre-wrap;">{{ message }}</p>
{% endblock %}"#,
    ),
];

pub struct Templates {
    env: Environment<'static>,
    site_name: String,
    site_url: String,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates").field("site_name", &self.site_name).finish()
    }
}

impl Templates {
    pub fn new(site_name: &str, site_url: &str) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("layout.html", LAYOUT_HTML)?;
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self {
            env,
            site_name: site_name.to_owned(),
            site_url: site_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    fn render(
        &self,
        name: &str,
        subject: String,
        to: &str,
        ctx: minijinja::Value,
    ) -> Result<Email, SendError> {
        let ctx = context! { site_name => &self.site_name, site_url => &self.site_url, ..ctx };
        let text = self.env.get_template(&format!("{name}.txt"))?.render(&ctx)?;
        let html = self.env.get_template(&format!("{name}.html"))?.render(&ctx)?;
        Ok(Email { subject, text, html: Some(html), to: vec![to.to_owned()] })
    }

    pub fn message_notification(
        &self,
        to: &str,
        recipient: &str,
        sender: &str,
        preview: &str,
    ) -> Result<Email, SendError> {
        let subject = format!("New message from {sender} on {}", self.site_name);
        let chat_url = format!("{}/chat", self.site_url);
        self.render(
            "message_notification",
            subject,
            to,
            context! { recipient, sender, preview, chat_url },
        )
    }

    pub fn verify_email(&self, to: &str, name: &str, token: &str) -> Result<Email, SendError> {
        let verify_url = format!("{}/verify-email/{token}", self.site_url);
        let subject = format!("Verify your email for {}", self.site_name);
        self.render("verify_email", subject, to, context! { name, verify_url })
    }

    pub fn verification_success(&self, to: &str, name: &str) -> Result<Email, SendError> {
        let subject = format!("{} - Email Verification Successful", self.site_name);
        self.render("verification_success", subject, to, context! { name })
    }

    pub fn password_reset(
        &self,
        to: &str,
        name: &str,
        token: &str,
        ttl_hours: i64,
    ) -> Result<Email, SendError> {
        let reset_url = format!(
            "{}/reset-password?token={token}&email={}",
            self.site_url,
            encode_query_value(to)
        );
        let subject = format!("Password Reset - {}", self.site_name);
        self.render("password_reset", subject, to, context! { name, reset_url, ttl_hours })
    }

    pub fn password_reset_success(&self, to: &str, name: &str) -> Result<Email, SendError> {
        let subject = format!("Password Reset Successful - {}", self.site_name);
        self.render("password_reset_success", subject, to, context! { name })
    }

    pub fn contact_notice(
        &self,
        to: &str,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> Result<Email, SendError> {
        let title = format!("New Contact Form Submission: {subject}");
        self.render("contact_notice", title, to, context! { name, email, subject, message })
    }
}

/// Percent-encode the characters of an email address that are not safe in a
/// query value.
fn encode_query_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}
