//! One-card notices: decision results, QR/door changes and error pages.
use askama::Template;
use dropmate_common::{AccessRequest, RequestStatus};

use crate::error::AppError;

/// The locker or request a notice is about.
pub struct Subject {
    pub label: &'static str,
    pub id: String,
}

impl Subject {
    fn locker(locker_id: &str) -> Self {
        Self {
            label: "ตู้",
            id: locker_id.to_string(),
        }
    }

    fn request(request_id: &str) -> Self {
        Self {
            label: "คำขอ",
            id: request_id.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "notice.html")]
pub struct NoticeView {
    pub title: &'static str,
    /// Card accent: `ok`, `warn` or `err`.
    pub tone: &'static str,
    pub icon: &'static str,
    pub heading: &'static str,
    pub subject: Option<Subject>,
    pub message: Option<&'static str>,
    pub status: Option<RequestStatus>,
    pub detail: Option<String>,
    /// Locker whose live panel the notice links to.
    pub locker_link: Option<String>,
}

impl NoticeView {
    fn new(
        title: &'static str,
        tone: &'static str,
        icon: &'static str,
        heading: &'static str,
    ) -> Self {
        Self {
            title,
            tone,
            icon,
            heading,
            subject: None,
            message: None,
            status: None,
            detail: None,
            locker_link: None,
        }
    }

    fn about(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    fn saying(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn approved(request: &AccessRequest) -> Self {
        Self::new("อนุมัติแล้ว", "ok", "✅", "อนุมัติสำเร็จ")
            .about(Subject::request(&request.request_id))
            .saying("ได้รับการอนุมัติแล้ว")
    }

    pub fn denied(request: &AccessRequest) -> Self {
        Self::new("ปฏิเสธแล้ว", "err", "❌", "ปฏิเสธแล้ว")
            .about(Subject::request(&request.request_id))
            .saying("ถูกปฏิเสธแล้ว")
    }

    pub fn qr_disabled(locker_id: &str) -> Self {
        Self::new("ปิด QR", "warn", "⛔", "ปิดรับคำขอแล้ว")
            .about(Subject::locker(locker_id))
            .saying("ปิดรับคำขอชั่วคราว")
    }

    pub fn qr_enabled(locker_id: &str) -> Self {
        let mut view = Self::new("เปิดรับคำขอ", "ok", "✅", "เปิดรับคำขอแล้ว")
            .about(Subject::locker(locker_id));
        view.locker_link = Some(locker_id.to_string());
        view
    }

    pub fn door_changed(locker_id: &str, open: bool) -> Self {
        let view = if open {
            Self::new("เปิดประตู", "ok", "🔓", "เปิดประตูแล้ว")
        } else {
            Self::new("ปิดประตู", "warn", "🔒", "ปิดประตูแล้ว")
        };
        view.about(Subject::locker(locker_id))
    }
}

impl From<&AppError> for NoticeView {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::RequestNotFound(_) => {
                Self::new("ไม่พบคำขอ", "err", "❓", "ไม่พบคำขอนี้").saying("ไม่พบ Request ID ในระบบ")
            }
            AppError::AlreadyDecided { status, .. } => {
                let mut view = Self::new("ตัดสินใจแล้ว", "warn", "⚠️", "คำขอถูกตัดสินใจแล้ว");
                view.status = Some(*status);
                view
            }
            AppError::LockerDisabled(locker_id) => {
                let mut view = Self::new("ตู้ปิดใช้งาน", "err", "⛔", "ปิดรับคำขอชั่วคราว")
                    .about(Subject::locker(locker_id))
                    .saying("ถูกปิดโดยเจ้าของ");
                view.detail = Some("กรุณาติดต่อเจ้าของตู้".to_string());
                view
            }
            AppError::BadCommand(detail) => {
                let mut view = Self::new("Bad request", "err", "⚠️", "คำสั่งไม่ถูกต้อง");
                view.detail = Some(detail.clone());
                view
            }
            AppError::Render(_) => {
                Self::new("Error", "err", "⚠️", "เกิดข้อผิดพลาด").saying("กรุณาลองใหม่อีกครั้ง")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locker_ids_are_escaped() {
        let err = AppError::LockerDisabled("<b>x</b>".to_string());
        let html = NoticeView::from(&err).render().unwrap();
        assert!(html.contains("&lt;b&gt;x"));
        assert!(!html.contains("<b>x</b>"));
        assert!(html.contains("ถูกปิดโดยเจ้าของ"));
        assert!(!html.contains("EventSource"));
    }

    #[test]
    fn already_decided_shows_the_final_status() {
        let err = AppError::AlreadyDecided {
            request_id: "R1".to_string(),
            status: RequestStatus::Denied,
        };
        let html = NoticeView::from(&err).render().unwrap();
        assert!(html.contains("คำขอถูกตัดสินใจแล้ว"));
        assert!(html.contains(r#"<span class="pill">denied</span>"#));
    }

    #[test]
    fn qr_enabled_links_to_the_locker_panel() {
        let html = NoticeView::qr_enabled("L 1").render().unwrap();
        assert!(html.contains("เปิดรับคำขอแล้ว"));
        assert!(html.contains(r#"href="locker?locker_id=L%201""#));
    }

    #[test]
    fn door_notice_follows_the_new_state() {
        assert!(NoticeView::door_changed("L1", true).render().unwrap().contains("เปิดประตูแล้ว"));
        assert!(NoticeView::door_changed("L1", false).render().unwrap().contains("ปิดประตูแล้ว"));
    }
}
