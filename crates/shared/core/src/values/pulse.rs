/// A payload-free cadence signal delivered to trigger subscribers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pulse;
