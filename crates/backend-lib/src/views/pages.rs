//! Full pages: home, the scan waiting page, request status and the locker panel.
use askama::Template;
use dropmate_common::{AccessRequest, Locker, RequestStatus};

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeView {
    pub locker_id: String,
}

impl HomeView {
    pub fn new(default_locker_id: &str) -> Self {
        Self {
            locker_id: default_locker_id.to_string(),
        }
    }
}

/// Waiting page shown right after a scan; follows the request stream.
#[derive(Template)]
#[template(path = "scan_pending.html")]
pub struct ScanPendingView {
    pub request_id: String,
    pub locker_id: String,
}

impl From<AccessRequest> for ScanPendingView {
    fn from(request: AccessRequest) -> Self {
        Self {
            request_id: request.request_id,
            locker_id: request.locker_id,
        }
    }
}

#[derive(Template)]
#[template(path = "request_status.html")]
pub struct RequestStatusView {
    pub request_id: String,
    pub locker_id: String,
    pub status_text: &'static str,
    pub icon: &'static str,
    pub pill_class: &'static str,
    pub card_class: &'static str,
}

impl From<AccessRequest> for RequestStatusView {
    fn from(request: AccessRequest) -> Self {
        let (status_text, icon, pill_class, card_class) = match request.status {
            RequestStatus::Pending => ("กำลังรอเจ้าของตัดสินใจ...", "⏳", "pending", ""),
            RequestStatus::Approved => ("อนุมัติแล้ว (ตู้เปิดสำเร็จ)", "✅", "ok", "ok"),
            RequestStatus::Denied => ("ถูกปฏิเสธโดยเจ้าของ", "❌", "err", "err"),
            RequestStatus::Closed => ("ปิดคำขอ", "⛔", "err", "err"),
        };
        Self {
            request_id: request.request_id,
            locker_id: request.locker_id,
            status_text,
            icon,
            pill_class,
            card_class,
        }
    }
}

/// Live QR/door panel; follows the locker stream.
#[derive(Template)]
#[template(path = "locker.html")]
pub struct LockerView {
    pub locker_id: String,
    pub disabled: bool,
    pub door_open: bool,
}

impl From<Locker> for LockerView {
    fn from(locker: Locker) -> Self {
        Self {
            locker_id: locker.locker_id,
            disabled: locker.disabled,
            door_open: locker.door_open,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: RequestStatus) -> AccessRequest {
        AccessRequest {
            request_id: "R1".to_string(),
            locker_id: "L1".to_string(),
            status,
            created_at: 0,
        }
    }

    #[test]
    fn home_links_stay_relative_to_the_mount_point() {
        let html = HomeView::new("LOCKER 1&x").render().unwrap();
        assert!(html.contains(r#"href="scan?locker_id=LOCKER%201%26x""#));
        assert!(html.contains(r#"href="locker?locker_id=LOCKER%201%26x""#));
        assert!(!html.contains(r#"href="/"#));
    }

    #[test]
    fn scan_page_opens_the_request_stream_by_relative_url() {
        let html = ScanPendingView::from(request(RequestStatus::Pending))
            .render()
            .unwrap();
        assert!(html.contains("new EventSource('status-stream?request_id='"));
        assert!(!html.contains("'/status-stream"));
        assert!(html.contains(r#"data-request-id="R1""#));
        assert!(html.contains(r#"href="status?request_id=R1""#));
    }

    #[test]
    fn request_ids_are_escaped_in_markup_and_attributes() {
        let mut req = request(RequestStatus::Pending);
        req.request_id = r#""><script>alert(1)</script>"#.to_string();
        let html = ScanPendingView::from(req).render().unwrap();
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains(r#"data-request-id=""><"#));
    }

    #[test]
    fn status_page_reflects_the_status() {
        let render = |status| RequestStatusView::from(request(status)).render().unwrap();
        assert!(render(RequestStatus::Pending).contains("กำลังรอเจ้าของตัดสินใจ..."));
        assert!(render(RequestStatus::Approved).contains("อนุมัติแล้ว (ตู้เปิดสำเร็จ)"));
        assert!(render(RequestStatus::Denied).contains("ถูกปฏิเสธโดยเจ้าของ"));
        assert!(render(RequestStatus::Closed).contains("ปิดคำขอ"));
    }

    #[test]
    fn locker_page_shows_only_the_current_flags() {
        let mut locker = Locker::new("L1");
        locker.disabled = true;
        locker.door_open = true;
        let html = LockerView::from(locker).render().unwrap();
        assert!(html.contains("new EventSource('locker-stream?locker_id='"));
        assert!(html.contains(r#"id="qr-on" hidden>"#));
        assert!(html.contains(r#"id="qr-off">🔴 ปิด"#));
        assert!(html.contains(r#"id="door-open">🔓 เปิด"#));
        assert!(html.contains(r#"id="door-closed" hidden>"#));
    }
}
