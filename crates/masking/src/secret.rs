//!
//! Structure describing secret.
//!

use std::{fmt, marker::PhantomData};

use crate::{strategy::Strategy, PeekInterface};

///
/// Secret thing.
///
/// To get access to the value use the method `expose()` of trait
/// [`crate::ExposeInterface`], or `peek()` of trait [`crate::PeekInterface`]
/// for a reference.
///
/// ## Masking
/// Use the [`crate::strategy::Strategy`] trait to implement a masking strategy
/// on a unit struct and pass the unit struct as a second generic parameter to
/// [`Secret`] while defining it. [`Secret`] will take care of applying the
/// masking strategy on the inner secret when being displayed.
///
pub struct Secret<S, I = crate::WithType>
where
    I: Strategy<S>,
{
    pub(crate) inner_secret: S,
    pub(crate) marker: PhantomData<I>,
}

impl<S, I> Secret<S, I>
where
    I: Strategy<S>,
{
    /// Take ownership of a secret value
    pub fn new(secret: S) -> Self {
        Self {
            inner_secret: secret,
            marker: PhantomData,
        }
    }

    /// Zip two secrets into one, keeping the masking strategy of the first
    pub fn zip<T>(self, other: Secret<T, I>) -> Secret<(S, T), I>
    where
        I: Strategy<T> + Strategy<(S, T)>,
    {
        (self.inner_secret, other.inner_secret).into()
    }

    /// Transform the inner secret without exposing it
    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Secret<T, I>
    where
        I: Strategy<T>,
    {
        f(self.inner_secret).into()
    }

    /// Switch the masking strategy of this secret
    pub fn switch_strategy<J>(self) -> Secret<S, J>
    where
        J: Strategy<S>,
    {
        self.inner_secret.into()
    }
}

impl<S, I> PeekInterface<S> for Secret<S, I>
where
    I: Strategy<S>,
{
    fn peek(&self) -> &S {
        &self.inner_secret
    }
}

impl<S, I> From<S> for Secret<S, I>
where
    I: Strategy<S>,
{
    fn from(secret: S) -> Self {
        Self::new(secret)
    }
}

impl<S, I> Clone for Secret<S, I>
where
    S: Clone,
    I: Strategy<S>,
{
    fn clone(&self) -> Self {
        Self {
            inner_secret: self.inner_secret.clone(),
            marker: PhantomData,
        }
    }
}

impl<S, I> PartialEq for Secret<S, I>
where
    Self: PeekInterface<S>,
    S: PartialEq,
    I: Strategy<S>,
{
    fn eq(&self, other: &Self) -> bool {
        self.peek().eq(other.peek())
    }
}

impl<S, I> Eq for Secret<S, I>
where
    Self: PeekInterface<S>,
    S: Eq,
    I: Strategy<S>,
{
}

impl<S, I> fmt::Debug for Secret<S, I>
where
    I: Strategy<S>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        I::fmt(&self.inner_secret, f)
    }
}

impl<S, I> Default for Secret<S, I>
where
    S: Default,
    I: Strategy<S>,
{
    fn default() -> Self {
        S::default().into()
    }
}
