pub mod avatar;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod peer;
pub mod presenter;
pub mod protocol;
pub mod session;
pub mod signaling;
pub mod voice;

pub use avatar::{resolve_selector, AvatarProfile};
pub use config::Config;
pub use conversation::{ControllerHandle, ConversationController, ConversationTurn, Role, TurnState};
pub use error::{CaptureError, NegotiationError, ProtocolError, SessionError, SignalingError};
pub use http::{create_router, AppState};
pub use peer::{PeerConnection, PeerSession, SessionDescription, WebRtcPeerConnection};
pub use presenter::{Presenter, ViewPresenter, ViewState};
pub use protocol::{ChannelMessage, DataChannelProtocol};
pub use session::{Session, SessionConfig, SessionId, SessionLifecycle, SessionSnapshot, SessionStatus};
pub use signaling::{HttpSignaling, SignalingTransport};
pub use voice::{CaptureFeed, ChannelCapture, ChannelRecognizer, RecognizerFeed, VoiceInput};
