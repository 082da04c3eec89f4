//! Email template rendering.
//!
//! Templates use `{{placeholder}}` variables filled from contact fields.
//! Unknown or missing values render as empty strings, so substitution can
//! never fail. If a rendered body does not mention the contact's first
//! name, a greeting is prepended so no message goes out unaddressed.

use crate::domain::Contact;

/// The placeholders recognized in subject and body templates.
const PLACEHOLDERS: [&str; 5] = ["firstName", "lastName", "name", "company", "title"];

/// Substitutes recognized placeholders with the contact's fields.
pub fn render(template: &str, contact: &Contact) -> String {
    let mut rendered = template.to_string();
    for key in PLACEHOLDERS {
        let token = format!("{{{{{}}}}}", key);
        if !rendered.contains(&token) {
            continue;
        }
        let value = match key {
            "firstName" => contact.first_name.clone().unwrap_or_default(),
            "lastName" => contact.last_name.clone().unwrap_or_default(),
            "name" => contact.display_name(),
            "company" => contact.company.clone().unwrap_or_default(),
            "title" => contact.title.clone().unwrap_or_default(),
            _ => String::new(),
        };
        rendered = rendered.replace(&token, &value);
    }
    rendered
}

/// Prepends a greeting when the body does not mention the contact's
/// first name. Bodies for contacts without a first name are returned
/// unchanged.
pub fn ensure_greeting(body: &str, contact: &Contact) -> String {
    let Some(first) = contact.first_name.as_deref().filter(|f| !f.is_empty()) else {
        return body.to_string();
    };
    if body.contains(first) {
        return body.to_string();
    }
    format!("Hi {},\n\n{}", first, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> Contact {
        Contact {
            email: "ada@widgets.io".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            company: Some("Widgets Inc".to_string()),
            title: Some("CTO".to_string()),
            industry: None,
        }
    }

    #[test]
    fn renders_all_placeholders() {
        let out = render(
            "{{firstName}} {{lastName}} ({{name}}) at {{company}}, {{title}}",
            &contact(),
        );
        assert_eq!(out, "Ada Lovelace (Ada Lovelace) at Widgets Inc, CTO");
    }

    #[test]
    fn missing_values_render_empty() {
        let bare = Contact::new("ops@example.com");
        let out = render("Hello {{firstName}} from {{company}}!", &bare);
        assert_eq!(out, "Hello  from !");
    }

    #[test]
    fn unrecognized_placeholders_are_left_alone() {
        let out = render("{{nickname}}", &contact());
        assert_eq!(out, "{{nickname}}");
    }

    #[test]
    fn greeting_added_when_first_name_absent_from_body() {
        let out = ensure_greeting("Quick question about your roadmap.", &contact());
        assert!(out.starts_with("Hi Ada,\n\n"));
        assert!(out.ends_with("Quick question about your roadmap."));
    }

    #[test]
    fn greeting_not_duplicated() {
        let body = "Hi Ada, following up on my last note.";
        assert_eq!(ensure_greeting(body, &contact()), body);
    }

    #[test]
    fn greeting_skipped_without_first_name() {
        let bare = Contact::new("ops@example.com");
        let body = "Quick question.";
        assert_eq!(ensure_greeting(body, &bare), body);
    }
}
