//! View models for the visitor and owner pages.
//!
//! Each struct renders one askama template under `templates/`; all of them
//! extend `layout.html`. Values are auto-escaped by askama, and inline
//! scripts read ids back from `data-*` attributes.

pub mod notice;
pub mod pages;

pub use notice::{NoticeView, Subject};
pub use pages::{HomeView, LockerView, RequestStatusView, ScanPendingView};
