//! Finds raw JSON pages and turns them into a collapsible, searchable tree.
//!
//! An [`Observer`] watches network and tab events and asks the [`Renderer`] of a
//! tab to look for JSON; the renderer parses the page, builds a [`TreeView`], and
//! serves search, inspection and toolbar actions on it.

pub mod config;
pub mod detect;
pub mod error;
pub mod messenger;
pub mod node;
pub mod observer;
pub mod path;
pub mod protocol;
pub mod render;
pub mod renderer;
pub mod search;
pub mod tree;
pub mod types;

pub use config::{ObserverConfig, Settings, Theme, ViewerConfig};
pub use detect::{detect_json, PageContent, PageSource, Recovery};
pub use error::{DeliveryError, Error, Result};
pub use messenger::{serve_renderer, TabId, TabMessenger, TabRegistry};
pub use observer::Observer;
pub use path::{JsonPath, PathToken};
pub use protocol::{Request, Response, Status};
pub use render::{HtmlSink, NullSink, RenderEvent, RenderSink, TextSink};
pub use renderer::{Renderer, Shortcut};
pub use tree::TreeView;
