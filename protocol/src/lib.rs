//! Wire vocabulary shared between the board engine and anything that talks
//! to a carte server: the card token format and the `|`-delimited messages.

mod card;
mod wire;

pub use card::{Card, MalformedCardError, CARD_SEPARATOR};
pub use wire::{encode_fields, Inbound, Outbound, WireError, DELIMITER};
