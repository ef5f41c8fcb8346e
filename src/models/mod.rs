pub mod event;
pub mod order;
pub mod ticket;
pub mod user;

pub use event::Event;
pub use order::Order;
pub use ticket::{Ticket, TicketType};
pub use user::User;
