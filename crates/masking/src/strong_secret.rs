//!
//! Structure describing a secret that is zeroized on drop.
//!

use std::{fmt, marker::PhantomData};

use subtle::ConstantTimeEq;
use zeroize::{DefaultIsZeroes, Zeroize};

use crate::{strategy::Strategy, PeekInterface};

/// Secret that is zeroized on drop. Equality checks run in constant time.
pub struct StrongSecret<S: Zeroize, I = crate::WithType> {
    /// Inner secret value
    pub(crate) inner_secret: S,
    pub(crate) marker: PhantomData<I>,
}

impl<S: Zeroize, I> StrongSecret<S, I> {
    /// Take ownership of a secret value
    pub fn new(secret: S) -> Self {
        Self {
            inner_secret: secret,
            marker: PhantomData,
        }
    }
}

impl<S: Zeroize, I> PeekInterface<S> for StrongSecret<S, I> {
    fn peek(&self) -> &S {
        &self.inner_secret
    }
}

impl<S: Zeroize, I> From<S> for StrongSecret<S, I> {
    fn from(secret: S) -> Self {
        Self::new(secret)
    }
}

impl<S: Clone + Zeroize, I> Clone for StrongSecret<S, I> {
    fn clone(&self) -> Self {
        Self {
            inner_secret: self.inner_secret.clone(),
            marker: PhantomData,
        }
    }
}

impl<S: Zeroize, I> PartialEq for StrongSecret<S, I>
where
    Self: PeekInterface<S>,
    S: StrongEq,
{
    fn eq(&self, other: &Self) -> bool {
        StrongEq::strong_eq(self.peek(), other.peek())
    }
}

impl<S: Zeroize, I> Eq for StrongSecret<S, I>
where
    Self: PeekInterface<S>,
    S: StrongEq,
{
}

impl<S: Zeroize, I: Strategy<S>> fmt::Debug for StrongSecret<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        I::fmt(&self.inner_secret, f)
    }
}

impl<S: Zeroize + Default, I> Default for StrongSecret<S, I> {
    fn default() -> Self {
        S::default().into()
    }
}

impl<S: Zeroize, I> Drop for StrongSecret<S, I> {
    fn drop(&mut self) {
        self.inner_secret.zeroize();
    }
}

/// Constant-time equality for secret payloads.
trait StrongEq {
    fn strong_eq(&self, other: &Self) -> bool;
}

impl StrongEq for String {
    fn strong_eq(&self, other: &Self) -> bool {
        let lhs = self.as_bytes();
        let rhs = other.as_bytes();

        bool::from(lhs.ct_eq(rhs))
    }
}

impl<T: DefaultIsZeroes + ConstantTimeEq> StrongEq for Vec<T> {
    fn strong_eq(&self, other: &Self) -> bool {
        bool::from(self.ct_eq(other))
    }
}
