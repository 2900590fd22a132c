//! Resolution of email metadata that may sit at the top level of a record
//! or nested under `meta.email`.
//!
//! Precedence, first present value wins:
//!
//! | field       | lookup order                                 |
//! |-------------|----------------------------------------------|
//! | `subject`   | top-level, `meta.email`                      |
//! | `from`/`to` | top-level, `meta.email`, `meta`              |
//! | `cc`/`bcc`  | top-level, `meta.email`                      |
//!
//! An empty string counts as missing. A list counts as present even when
//! empty.

use vault_core::{AddressField, EmailMeta, EmailMessageRecord, MessageRecord};

fn first_text(candidates: [Option<&String>; 3]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .cloned()
        .unwrap_or_default()
}

fn first_address(candidates: [Option<&AddressField>; 3]) -> Vec<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|field| field.is_present())
        .cloned()
        .map(AddressField::into_values)
        .unwrap_or_default()
}

/// Normalize a raw message into an [`EmailMessageRecord`].
pub fn resolve_email(message: &MessageRecord) -> EmailMessageRecord {
    let meta = message.meta.as_ref();
    let nested: Option<&EmailMeta> = meta.and_then(|m| m.email.as_ref());

    EmailMessageRecord {
        subject: first_text([
            message.subject.as_ref(),
            nested.and_then(|e| e.subject.as_ref()),
            None,
        ]),
        from: first_text([
            message.from.as_ref(),
            nested.and_then(|e| e.from.as_ref()),
            meta.and_then(|m| m.from.as_ref()),
        ]),
        to: first_address([
            message.to.as_ref(),
            nested.and_then(|e| e.to.as_ref()),
            meta.and_then(|m| m.to.as_ref()),
        ]),
        cc: first_address([
            message.cc.as_ref(),
            nested.and_then(|e| e.cc.as_ref()),
            None,
        ]),
        bcc: first_address([
            message.bcc.as_ref(),
            nested.and_then(|e| e.bcc.as_ref()),
            None,
        ]),
        message: message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_core::MessageMeta;

    fn nested_meta() -> MessageMeta {
        MessageMeta {
            email: Some(EmailMeta {
                subject: Some("Nested subject".into()),
                from: Some("nested@x.com".into()),
                to: Some(AddressField::List(vec!["n1@x.com".into(), "n2@x.com".into()])),
                cc: Some(AddressField::Single("ncc@x.com".into())),
                bcc: None,
            }),
            from: Some("meta@x.com".into()),
            to: Some(AddressField::Single("meta-to@x.com".into())),
        }
    }

    #[test]
    fn test_top_level_wins() {
        let message = MessageRecord {
            subject: Some("Top subject".into()),
            from: Some("top@x.com".into()),
            to: Some(AddressField::Single("top-to@x.com".into())),
            meta: Some(nested_meta()),
            ..Default::default()
        };

        let email = resolve_email(&message);
        assert_eq!(email.subject, "Top subject");
        assert_eq!(email.from, "top@x.com");
        assert_eq!(email.to, vec!["top-to@x.com"]);
        assert_eq!(email.cc, vec!["ncc@x.com"]);
        assert!(email.bcc.is_empty());
    }

    #[test]
    fn test_falls_back_to_nested_then_meta() {
        let mut meta = nested_meta();
        if let Some(email) = meta.email.as_mut() {
            email.from = None;
            email.to = None;
        }
        let message = MessageRecord {
            subject: Some(String::new()),
            meta: Some(meta),
            ..Default::default()
        };

        let email = resolve_email(&message);
        assert_eq!(email.subject, "Nested subject");
        assert_eq!(email.from, "meta@x.com");
        assert_eq!(email.to, vec!["meta-to@x.com"]);
    }

    #[test]
    fn test_empty_list_is_present() {
        let message = MessageRecord {
            to: Some(AddressField::List(vec![])),
            meta: Some(nested_meta()),
            ..Default::default()
        };

        assert!(resolve_email(&message).to.is_empty());
    }

    #[test]
    fn test_no_metadata() {
        let email = resolve_email(&MessageRecord::default());
        assert_eq!(email.subject, "");
        assert_eq!(email.from, "");
        assert!(email.to.is_empty() && email.cc.is_empty() && email.bcc.is_empty());
    }
}
