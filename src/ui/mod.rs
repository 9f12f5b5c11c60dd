//! 展示层：渲染命令接口（presenter）、确认（confirm），以及 Ratatui TUI（app / event / render）

pub mod app;
pub mod confirm;
pub mod event;
pub mod presenter;
pub mod render;

pub use app::run_app;
pub use confirm::{AlwaysConfirm, Confirm, ConfirmRequest, TuiConfirm};
pub use event::EventHandler;
pub use presenter::{Presenter, WatchPresenter};
pub use render::draw;
