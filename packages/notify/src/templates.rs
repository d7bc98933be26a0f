//! Subjects and HTML bodies for every notice the system sends.

use kitflow_core::{ContactInput, ProjectRequest};

/// A rendered notice: subject line plus HTML body.
#[derive(Debug, Clone)]
pub struct Notice {
    pub subject: String,
    pub html: String,
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn detail_row(label: &str, value: &Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => {
            format!("<p><strong>{label}:</strong> {}</p>", escape_html(v))
        }
        _ => String::new(),
    }
}

/// Operator notice: a new request is waiting for review.
pub fn request_submitted(request: &ProjectRequest) -> Notice {
    let title = escape_html(request.display_title());
    let mut html = format!(
        "<h2>New {} request</h2>\
         <p>A new custom request is waiting for review in the dashboard.</p>\
         <hr>\
         <p><strong>From:</strong> {} &lt;{}&gt;</p>\
         <p><strong>Title:</strong> {title}</p>",
        request.kind,
        escape_html(&request.name),
        escape_html(&request.email),
    );
    html.push_str(&detail_row("Description", &request.description));
    html.push_str(&detail_row("Microcontroller", &request.microcontroller));
    html.push_str(&detail_row("Components", &request.components));
    html.push_str(&detail_row("Budget", &request.budget));
    html.push_str(&detail_row("Audience", &request.audience));
    html.push_str(&detail_row("Purpose", &request.purpose));
    html.push_str(&detail_row("Style", &request.style));
    html.push_str(&detail_row("Instructions", &request.instructions));

    Notice {
        subject: format!("New Request: {}", request.display_title()),
        html,
    }
}

/// Customer notice: the request was approved; includes the new project
/// id and where to follow it.
pub fn request_approved(request: &ProjectRequest, project_id: &str, tracking_url: &str) -> Notice {
    let title = escape_html(request.display_title());
    let mut html = format!(
        "<h2>Great news! Your request has been approved.</h2>\
         <p>Your project tracking ID is: <strong>{project_id}</strong></p>\
         <p>You can follow your project's progress at any time:</p>\
         <p><a href=\"{tracking_url}\">View Project Status</a></p>\
         <hr>\
         <h3>Project Details:</h3>\
         <p><strong>Title:</strong> {title}</p>",
    );
    html.push_str(&detail_row("Description", &request.description));
    html.push_str("<p>We'll keep you updated as your project moves through each stage.</p>");

    Notice {
        subject: format!(
            "Your Project Request Has Been Approved! ({})",
            request.display_title()
        ),
        html,
    }
}

/// Customer notice: the request was declined.
pub fn request_declined(request: &ProjectRequest) -> Notice {
    let title = escape_html(request.display_title());
    let mut html = format!(
        "<h2>Update on Your Request</h2>\
         <p>Thank you for your interest in our services. After careful review, \
         we are unable to proceed with this request at the moment.</p>\
         <p>Feel free to reach out to discuss alternatives or submit a modified request.</p>\
         <hr>\
         <h3>Project Details:</h3>\
         <p><strong>Title:</strong> {title}</p>",
    );
    html.push_str(&detail_row("Description", &request.description));
    html.push_str("<p>We appreciate your understanding and hope to work with you in the future.</p>");

    Notice {
        subject: format!("Update on Your Project Request ({})", request.display_title()),
        html,
    }
}

/// Operator notice: a contact-form message, relayed verbatim.
pub fn contact_message(contact: &ContactInput) -> Notice {
    let subject = contact
        .subject
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("New contact message");

    let html = format!(
        "<h2>Contact message</h2>\
         <p><strong>From:</strong> {} &lt;{}&gt;</p>\
         <hr>\
         <p>{}</p>",
        escape_html(&contact.name),
        escape_html(&contact.email),
        escape_html(&contact.message),
    );

    Notice {
        subject: subject.to_string(),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kitflow_core::RequestKind;

    fn request() -> ProjectRequest {
        ProjectRequest {
            id: "r1".to_string(),
            created_at: Utc::now(),
            kind: RequestKind::Project,
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            project_title: Some("Line Follower Bot".to_string()),
            microcontroller: Some("Arduino Uno".to_string()),
            components: None,
            description: Some("A bot that follows a <black> line.".to_string()),
            budget: Some("2000".to_string()),
            topic: None,
            audience: None,
            purpose: None,
            style: None,
            instructions: None,
        }
    }

    #[test]
    fn approved_notice_references_project_and_link() {
        let notice = request_approved(&request(), "SK-1024", "https://kitflow.example/tracking");
        assert!(notice.subject.contains("Line Follower Bot"));
        assert!(notice.html.contains("SK-1024"));
        assert!(notice.html.contains("https://kitflow.example/tracking"));
    }

    #[test]
    fn bodies_escape_html_in_user_content() {
        let notice = request_submitted(&request());
        assert!(notice.html.contains("&lt;black&gt;"));
        assert!(!notice.html.contains("<black>"));
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let notice = request_submitted(&request());
        assert!(!notice.html.contains("Components:"));
        assert!(notice.html.contains("Budget:"));
    }

    #[test]
    fn contact_subject_falls_back() {
        let notice = contact_message(&ContactInput {
            name: "Ravi".to_string(),
            email: "ravi@example.com".to_string(),
            subject: Some("  ".to_string()),
            message: "Do you ship abroad?".to_string(),
        });
        assert_eq!(notice.subject, "New contact message");
    }
}
