pub mod http;
pub mod kv;
mod media_library;
mod navigation;
mod permissions;
mod timer;

pub use self::media_library::{
    classify_url, MediaLibrary, MediaLibraryError, MediaLibraryOperation, MediaLibraryOutput,
    MediaLibraryResult,
};
pub use self::navigation::{Navigation, NavigationOperation};
pub use self::permissions::{
    Permission, PermissionError, PermissionOperation, PermissionResult, PermissionStatus,
    Permissions,
};
pub use self::timer::{Timer, TimerOperation, TimerOutput};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub permissions: Permissions<Event>,
    pub media_library: MediaLibrary<Event>,
    pub navigation: Navigation<Event>,
    pub timer: Timer<Event>,
}
