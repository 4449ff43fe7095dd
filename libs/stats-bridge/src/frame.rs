use std::ops::{Deref, DerefMut};

use crate::env::ForeignEnv;
use crate::error::ForeignError;

/// Scoped local frame. Popped when the guard goes out of scope, whether the
/// scope finished or bailed out with `?`.
///
/// Work inside the scope goes through the guard (`&mut *frame`).
pub struct LocalFrame<'env, E: ForeignEnv + ?Sized> {
    env: &'env mut E,
}

impl<'env, E: ForeignEnv + ?Sized> LocalFrame<'env, E> {
    pub fn push(env: &'env mut E, capacity: usize) -> Result<Self, ForeignError> {
        env.push_local_frame(capacity)?;
        Ok(Self { env })
    }
}

impl<E: ForeignEnv + ?Sized> Deref for LocalFrame<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.env
    }
}

impl<E: ForeignEnv + ?Sized> DerefMut for LocalFrame<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.env
    }
}

impl<E: ForeignEnv + ?Sized> Drop for LocalFrame<'_, E> {
    fn drop(&mut self) {
        self.env.pop_local_frame();
    }
}
