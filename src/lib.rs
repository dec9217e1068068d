//! Headless block-editing engine.
//!
//! A document is an ordered list of typed blocks owned by a [`BlockStore`].
//! Three controllers sit on top of one store per [`EditingSession`]: keyboard
//! and mouse focus ([`navigation`]), confirmed and undoable deletion
//! ([`deletion`]) and drag reordering ([`drag`]). Rendering is left to a
//! collaborator; [`render`] is the terminal one used by the `blockwise`
//! binary.

pub mod block;
pub mod config;
pub mod deletion;
pub mod drag;
pub mod error;
pub mod events;
pub mod layout;
pub mod navigation;
pub mod persistence;
pub mod render;
pub mod session;
pub mod store;
pub mod theme;

pub use block::{Block, BlockContent, BlockData, BlockId, BlockKind, BlockMetadata, BlockUpdate};
pub use config::{EditorConfig, ImportanceRules};
pub use error::{BlockwiseError, Result};
pub use events::{CommandQueue, EditorCommand};
pub use navigation::FocusState;
pub use session::EditingSession;
pub use store::{BlockStore, InsertPosition, MovePosition, StoreEvent, StoreEventKind};
