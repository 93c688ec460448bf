pub mod akbank;
pub mod estpos;
pub mod garanti;
pub mod kuveyt;
pub mod posnet;

pub use self::{
    akbank::Akbank, estpos::Estpos, garanti::Garanti, kuveyt::Kuveyt, posnet::Posnet,
};
