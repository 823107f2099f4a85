// ABOUTME: Remote shell or command session over one SSH channel.
// ABOUTME: Type-state session, the channel seam, and the controller that picks the path.

mod channel;
mod controller;
mod error;
mod remote;
mod state;

pub use channel::{ChannelEvent, ShellChannel};
pub use controller::SessionController;
pub use error::SessionError;
pub use remote::{RemoteSession, SessionIo, forward_input};
pub use state::{Completed, Created, PtyRequested, Running};
