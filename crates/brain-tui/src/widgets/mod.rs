//! Widgets for the Brain Terminal screens

pub mod input_box;
pub mod log_panel;
pub mod markdown;
pub mod message_list;
pub mod progress;
pub mod scan;
pub mod spinner;
pub mod typewriter;

pub use input_box::InputBox;
pub use log_panel::{LogPanel, StatusLog};
pub use message_list::{ChatMessage, MessageList, MessageStatus, Speaker};
pub use progress::{SeqAnimation, SeqBar, SeqPhase};
pub use scan::CranialScan;
pub use typewriter::Typewriter;
