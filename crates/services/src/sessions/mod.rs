//! Quiz session lifecycle: the pure state machine, its async driver and the
//! read-only views handed to the presentation layer.

mod driver;
mod machine;
mod progress;
mod view;

pub use driver::SessionDriver;
pub use machine::{Advance, AnswerOutcome, Phase, QuizSession, TickOutcome};
pub use progress::SessionProgress;
pub use view::{QuestionView, ReviewItem, SessionView, format_clock};
