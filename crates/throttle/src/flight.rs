//! Outcome sharing between a flight's owner and the callers that joined it

use keystone_core::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Outcome as handed to followers
pub(crate) type Shared<T> = std::result::Result<T, Arc<Error>>;

enum State<T> {
    Pending(Vec<oneshot::Sender<Shared<T>>>),
    Done(Shared<T>),
}

/// One local attempt at a hash, from acquisition through release
pub(crate) struct Flight<T> {
    state: Mutex<State<T>>,
}

/// What a joining caller gets back
pub(crate) enum Joined<T> {
    Ready(Shared<T>),
    Waiting(oneshot::Receiver<Shared<T>>),
}

impl<T: Clone> Flight<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::Pending(Vec::new())),
        })
    }

    pub fn join(&self) -> Joined<T> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Done(outcome) => Joined::Ready(outcome.clone()),
            State::Pending(followers) => {
                let (tx, rx) = oneshot::channel();
                followers.push(tx);
                Joined::Waiting(rx)
            }
        }
    }

    /// Settle the flight; later joiners get the same outcome
    pub fn complete(&self, outcome: Shared<T>) -> usize {
        let mut state = self.state.lock();
        let followers = match std::mem::replace(&mut *state, State::Done(outcome.clone())) {
            State::Pending(followers) => followers,
            State::Done(_) => Vec::new(),
        };
        let count = followers.len();
        for follower in followers {
            // A follower that stopped waiting is fine to skip
            let _ = follower.send(outcome.clone());
        }
        count
    }
}

/// Resolve a joined flight for one follower
pub(crate) async fn follow<T>(joined: Joined<T>, hash: &str) -> Result<T> {
    let outcome = match joined {
        Joined::Ready(outcome) => outcome,
        Joined::Waiting(rx) => rx.await.map_err(|_| Error::shutdown("throttle"))?,
    };
    outcome.map_err(|source| Error::coalesced(hash, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_followers_share_outcome() {
        let flight = Flight::<u32>::new();
        let early = flight.join();
        assert_eq!(flight.complete(Ok(5)), 1);
        let late = flight.join();

        assert_eq!(follow(early, "h").await.unwrap(), 5);
        assert_eq!(follow(late, "h").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_failure_reaches_followers_as_coalesced() {
        let flight = Flight::<u32>::new();
        let joined = flight.join();
        flight.complete(Err(Arc::new(Error::worker("boom"))));

        match follow(joined, "h").await {
            Err(Error::Coalesced { hash, source }) => {
                assert_eq!(hash, "h");
                assert!(matches!(*source, Error::Worker { .. }));
            }
            other => panic!("expected Coalesced, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_abandoned_flight() {
        let flight = Flight::<u32>::new();
        let joined = flight.join();
        drop(flight);
        assert!(matches!(follow(joined, "h").await, Err(Error::Shutdown { .. })));
    }
}
