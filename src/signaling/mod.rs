pub mod client;
pub mod messages;
mod transport;

pub use client::HttpSignaling;
pub use messages::{
    AnswerResponse, AvatarListResponse, AvatarRecord, ChatRequest, NegotiatedAnswer, OfferRequest,
};
pub use transport::SignalingTransport;
