// ============================
// dropmate-backend-lib/src/richmenu.rs
// ============================
//! One-off LINE rich-menu provisioning used by `dropmate richmenu`.
//!
//! The menu is a 2x2 grid of postback buttons (enable, disable, status,
//! unlock) bound to the default locker.
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::messaging::LINE_API_BASE;

pub const LINE_DATA_API_BASE: &str = "https://api-data.line.me";
pub const MAX_IMAGE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_IMAGE: &str = "richmenu.png";

#[derive(Debug, thiserror::Error)]
pub enum RichMenuError {
    #[error("unsupported image type {0:?} (use .png, .jpg or .jpeg)")]
    UnsupportedImage(String),

    #[error("image is {kib} KiB; compress it to at most 1024 KiB (2500x843 or 2500x1686)")]
    ImageTooLarge { kib: u64 },

    #[error("cannot read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode postback data: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{method} {path} -> {status}: {body}")]
    HttpStatus {
        method: Method,
        path: String,
        status: u16,
        body: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostbackAction {
    #[serde(rename = "type")]
    kind: &'static str,
    pub data: String,
    #[serde(rename = "displayText")]
    pub display_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Area {
    pub bounds: Bounds,
    pub action: PostbackAction,
}

/// Rich-menu object as the create endpoint expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichMenu {
    pub size: Size,
    pub selected: bool,
    pub name: String,
    #[serde(rename = "chatBarText")]
    pub chat_bar_text: String,
    pub areas: Vec<Area>,
}

impl RichMenu {
    /// The locker control grid, wired to `locker_id`.
    pub fn locker_controls(locker_id: &str) -> Result<Self, RichMenuError> {
        let button = |x, y, height, action: &str, label: &str| -> Result<Area, RichMenuError> {
            Ok(Area {
                bounds: Bounds {
                    x,
                    y,
                    width: 1250,
                    height,
                },
                action: PostbackAction {
                    kind: "postback",
                    data: serde_urlencoded::to_string([
                        ("action", action),
                        ("locker_id", locker_id),
                    ])?,
                    display_text: label.to_string(),
                },
            })
        };
        Ok(Self {
            size: Size {
                width: 2500,
                height: 843,
            },
            selected: true,
            name: "SmartLockerMenu".to_string(),
            chat_bar_text: "เมนูควบคุมตู้".to_string(),
            areas: vec![
                button(0, 0, 421, "enable", "✅ เปิด QR")?,
                button(1250, 0, 421, "disable", "⛔ ปิด QR")?,
                button(0, 421, 422, "status", "ℹ️ สถานะ")?,
                button(1250, 421, 422, "unlock", "🔓 ปลดล็อก")?,
            ],
        })
    }
}

/// Entry of the list endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichMenuSummary {
    #[serde(rename = "richMenuId")]
    pub rich_menu_id: String,
    #[serde(default)]
    pub name: String,
    pub size: Option<Size>,
}

#[derive(Deserialize)]
struct Created {
    #[serde(rename = "richMenuId")]
    rich_menu_id: String,
}

#[derive(Deserialize)]
struct Listing {
    #[serde(default)]
    richmenus: Vec<RichMenuSummary>,
}

/// A validated menu image ready for upload.
#[derive(Debug, Clone)]
pub struct MenuImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

impl MenuImage {
    pub async fn load(path: &Path) -> Result<Self, RichMenuError> {
        let content_type = content_type_for(path)?;
        check_size(tokio::fs::metadata(path).await?.len())?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { bytes, content_type })
    }
}

/// MIME type from the file extension.
pub fn content_type_for(path: &Path) -> Result<&'static str, RichMenuError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        _ => Err(RichMenuError::UnsupportedImage(path.display().to_string())),
    }
}

pub fn check_size(len: u64) -> Result<(), RichMenuError> {
    if len > MAX_IMAGE_BYTES {
        return Err(RichMenuError::ImageTooLarge { kib: len.div_ceil(1024) });
    }
    Ok(())
}

pub struct RichMenuClient {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
    data_base: String,
}

impl RichMenuClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::with_bases(access_token, LINE_API_BASE, LINE_DATA_API_BASE)
    }

    pub fn with_bases(
        access_token: impl Into<String>,
        api_base: impl Into<String>,
        data_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            data_base: data_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn send(
        &self,
        method: Method,
        base: &str,
        path: &str,
        build: impl FnOnce(reqwest::RequestBuilder) -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, RichMenuError> {
        let request = self
            .client
            .request(method.clone(), format!("{base}{path}"))
            .bearer_auth(&self.access_token);
        let response = build(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RichMenuError::HttpStatus {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Create a menu and return its id.
    pub async fn create(&self, menu: &RichMenu) -> Result<String, RichMenuError> {
        let response = self
            .send(Method::POST, &self.api_base, "/v2/bot/richmenu", |r| r.json(menu))
            .await?;
        Ok(response.json::<Created>().await?.rich_menu_id)
    }

    pub async fn upload_image(
        &self,
        rich_menu_id: &str,
        image: &MenuImage,
    ) -> Result<(), RichMenuError> {
        let bytes = image.bytes.clone();
        let content_type = image.content_type;
        self.send(
            Method::POST,
            &self.data_base,
            &format!("/v2/bot/richmenu/{rich_menu_id}/content"),
            |r| r.header(reqwest::header::CONTENT_TYPE, content_type).body(bytes),
        )
        .await?;
        Ok(())
    }

    /// Make the menu the default for every user.
    pub async fn set_default(&self, rich_menu_id: &str) -> Result<(), RichMenuError> {
        self.send(
            Method::POST,
            &self.api_base,
            &format!("/v2/bot/user/all/richmenu/{rich_menu_id}"),
            |r| r,
        )
        .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<RichMenuSummary>, RichMenuError> {
        let response = self
            .send(Method::GET, &self.api_base, "/v2/bot/richmenu/list", |r| r)
            .await?;
        Ok(response.json::<Listing>().await?.richmenus)
    }

    pub async fn delete(&self, rich_menu_id: &str) -> Result<(), RichMenuError> {
        self.send(
            Method::DELETE,
            &self.api_base,
            &format!("/v2/bot/richmenu/{rich_menu_id}"),
            |r| r,
        )
        .await?;
        Ok(())
    }

    /// Create, upload and set the locker menu. The image is checked first so
    /// a bad file leaves no half-built menu behind.
    pub async fn setup(
        &self,
        locker_id: &str,
        image_path: &Path,
    ) -> Result<String, RichMenuError> {
        let image = MenuImage::load(image_path).await?;
        let menu = RichMenu::locker_controls(locker_id)?;

        let id = self.create(&menu).await?;
        info!(rich_menu_id = %id, "rich menu created");
        self.upload_image(&id, &image).await?;
        info!(rich_menu_id = %id, bytes = image.bytes.len(), "image uploaded");
        self.set_default(&id).await?;
        info!(rich_menu_id = %id, "rich menu set as default");
        Ok(id)
    }

    /// Delete every menu on the channel.
    pub async fn clean(&self) -> Result<Vec<RichMenuSummary>, RichMenuError> {
        let menus = self.list().await?;
        for menu in &menus {
            info!(rich_menu_id = %menu.rich_menu_id, name = %menu.name, "deleting rich menu");
            self.delete(&menu.rich_menu_id).await?;
        }
        Ok(menus)
    }
}
