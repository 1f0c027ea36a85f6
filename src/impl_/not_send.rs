use std::marker::PhantomData;

/// Zero-sized field that keeps the GIL guards and the [`Gil`](crate::Gil) token on the thread
/// that created them: the lock state they restore belongs to that thread.
///
/// Raw pointers are neither `Send` nor `Sync`, and negative impls are unstable.
pub(crate) struct NotSend(PhantomData<*mut ()>);

pub(crate) const NOT_SEND: NotSend = NotSend(PhantomData);
