use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memory {
    MegaByte(u64),
    GigaByte(u64),
}

impl Display for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Memory::MegaByte(amount) => write!(f, "{}M", amount),
            Memory::GigaByte(amount) => write!(f, "{}G", amount),
        }
    }
}
