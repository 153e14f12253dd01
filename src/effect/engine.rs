//! The execution engine.
//!
//! A small-step interpreter over [`Node`]. Pending work lives on an explicit
//! frame stack instead of the call stack, so bind chains of any depth run in
//! constant native stack space. The only suspension point is a
//! [`Node::Lifted`] leaf, whose future is awaited before the loop continues.
//!
//! # Cancellation
//!
//! The environment's flag is consulted on every transition: before a node is
//! evaluated, before a continuation is invoked and when a suspended leaf
//! resumes. A cancelled run unwinds to [`Error::Cancelled`], skipping
//! continuations and recovery handlers but still executing every pending
//! finalizer and release. Once the flag is seen, any failure still in flight
//! is replaced by [`Error::Cancelled`] as well.
//!
//! Cleanup runs *shielded*: while a finalizer or release is executing the
//! flag is ignored, so cleanup always completes. Cancellation is observed
//! again as soon as the outermost shielded region ends.

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::environment::Environment;
use super::error::{Error, Outcome};
use super::node::{Child, Combine, Continuation, Effects, Handler, Node, Predicate, Prepare, Scope, Value};

const FRAME_INLINE_CAPACITY: usize = 8;

/// Work waiting for the outcome of the node currently being evaluated.
enum Frame<Env> {
    Bind(Continuation<Env>),
    Catch {
        predicate: Predicate,
        handler: Handler<Env>,
    },
    Choose(Child<Env>),
    /// Finalizer not started yet.
    Finalize(Child<Env>),
    /// Finalizer running; holds the outcome of the guarded computation.
    Finalized(Outcome<Value>),
    Acquire(Prepare<Env>),
    /// Release not started yet.
    Release(Node<Env>),
    /// Release running; holds the outcome of the body.
    Released(Outcome<Value>),
    Actions(ActionsFrame<Env>),
}

struct ActionsFrame<Env> {
    effects: Effects<Env>,
    accumulator: Value,
    combine: Combine,
}

enum Step<Env> {
    Eval(Node<Env>),
    Return(Outcome<Value>),
    Suspend(futures::future::BoxFuture<'static, Outcome<Value>>),
}

struct Engine<Env> {
    environment: Environment<Env>,
    stack: SmallVec<[Frame<Env>; FRAME_INLINE_CAPACITY]>,
    /// Depth of nested cleanup regions currently running.
    shield: usize,
}

/// Runs `node` to completion under `environment`.
pub(crate) async fn execute<Env>(node: Node<Env>, environment: Environment<Env>) -> Outcome<Value>
where
    Env: Send + Sync + 'static,
{
    let mut engine = Engine {
        environment,
        stack: SmallVec::new(),
        shield: 0,
    };
    let mut step = Step::Eval(node);

    loop {
        step = match step {
            Step::Eval(node) => engine.eval(node),
            Step::Suspend(future) => {
                let outcome = future.await;
                engine.resume(outcome)
            }
            Step::Return(outcome) => match engine.stack.pop() {
                Some(frame) => engine.unwind(frame, outcome),
                None => return engine.finish(outcome),
            },
        };
    }
}

impl<Env> Engine<Env> {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.shield == 0 && self.environment.is_cancelled()
    }

    fn cancelled(&self, at: &'static str) -> Step<Env> {
        trace!(at, depth = self.stack.len(), "cancellation observed");
        Step::Return(Err(Error::Cancelled))
    }

    fn eval(&mut self, node: Node<Env>) -> Step<Env> {
        if self.is_cancelled() {
            return self.cancelled(node.tag());
        }
        match node {
            Node::Pure(value) => Step::Return(Ok(value)),
            Node::Fail(error) => Step::Return(Err(error)),
            Node::Sync(effect) => Step::Return(effect(&self.environment)),
            Node::Lifted(thunk) => Step::Suspend(thunk(self.environment.clone())),
            Node::Bind(source, continuation) => {
                self.stack.push(Frame::Bind(continuation));
                Step::Eval(source.into_node())
            }
            Node::Catch {
                source,
                predicate,
                handler,
            } => {
                self.stack.push(Frame::Catch { predicate, handler });
                Step::Eval(source.into_node())
            }
            Node::Choose {
                primary,
                alternative,
            } => {
                self.stack.push(Frame::Choose(alternative));
                Step::Eval(primary.into_node())
            }
            Node::Finalize { source, finalizer } => {
                self.stack.push(Frame::Finalize(finalizer));
                Step::Eval(source.into_node())
            }
            Node::UseAcquire { acquire, prepare } => {
                self.stack.push(Frame::Acquire(prepare));
                Step::Eval(acquire.into_node())
            }
            Node::Actions {
                effects,
                seed,
                combine,
            } => self.next_action(ActionsFrame {
                effects,
                accumulator: seed,
                combine,
            }),
        }
    }

    fn resume(&self, outcome: Outcome<Value>) -> Step<Env> {
        // An acquired handle must reach its Acquire frame to be released.
        let holds_resource = matches!(self.stack.last(), Some(Frame::Acquire(_)));
        if !holds_resource && self.is_cancelled() {
            return self.cancelled("resume");
        }
        Step::Return(outcome)
    }

    fn unwind(&mut self, frame: Frame<Env>, outcome: Outcome<Value>) -> Step<Env> {
        match frame {
            Frame::Bind(continuation) => match outcome {
                _ if self.is_cancelled() => self.cancelled("bind"),
                Ok(value) => Step::Eval(continuation(value)),
                Err(error) => Step::Return(Err(error)),
            },
            Frame::Catch { predicate, handler } => match outcome {
                Err(_) if self.is_cancelled() => self.cancelled("catch"),
                Err(error) if error.is_recoverable() => {
                    if predicate(&error) {
                        Step::Eval(handler(error))
                    } else {
                        Step::Return(Err(error))
                    }
                }
                outcome => Step::Return(outcome),
            },
            Frame::Choose(alternative) => match outcome {
                Err(_) if self.is_cancelled() => self.cancelled("choose"),
                Err(error) if error.is_recoverable() => {
                    trace!(%error, "primary failed, trying alternative");
                    Step::Eval(alternative.into_node())
                }
                outcome => Step::Return(outcome),
            },
            Frame::Finalize(finalizer) => {
                self.enter_cleanup(Frame::Finalized(outcome));
                Step::Eval(finalizer.into_node())
            }
            Frame::Finalized(primary) => {
                self.shield -= 1;
                match (primary, outcome) {
                    (Ok(_), Err(error)) => Step::Return(Err(error)),
                    (primary @ Err(_), Err(error)) => {
                        debug!(%error, "finalizer failed after a failure; keeping the first failure");
                        Step::Return(primary)
                    }
                    (primary, Ok(_)) => Step::Return(primary),
                }
            }
            Frame::Acquire(prepare) => match outcome {
                Ok(handle) => {
                    let Scope { body, release } = prepare(handle);
                    self.stack.push(Frame::Release(release));
                    if self.is_cancelled() {
                        self.cancelled("acquire")
                    } else {
                        Step::Eval(body())
                    }
                }
                Err(_) if self.is_cancelled() => self.cancelled("acquire"),
                Err(error) => Step::Return(Err(error)),
            },
            Frame::Release(release) => {
                self.enter_cleanup(Frame::Released(outcome));
                Step::Eval(release)
            }
            Frame::Released(primary) => {
                self.shield -= 1;
                if let Err(error) = outcome {
                    warn!(%error, "resource release failed; suppressing");
                }
                Step::Return(primary)
            }
            Frame::Actions(frame) => match outcome {
                _ if self.is_cancelled() => self.cancelled("actions"),
                Ok(value) => {
                    let ActionsFrame {
                        effects,
                        accumulator,
                        mut combine,
                    } = frame;
                    let accumulator = combine(accumulator, value);
                    self.next_action(ActionsFrame {
                        effects,
                        accumulator,
                        combine,
                    })
                }
                Err(error) => Step::Return(Err(error)),
            },
        }
    }

    fn enter_cleanup(&mut self, pending: Frame<Env>) {
        trace!(shield = self.shield + 1, "running cleanup");
        self.shield += 1;
        self.stack.push(pending);
    }

    fn next_action(&mut self, mut frame: ActionsFrame<Env>) -> Step<Env> {
        match frame.effects.next() {
            Some(node) => {
                self.stack.push(Frame::Actions(frame));
                Step::Eval(node)
            }
            None => Step::Return(Ok(frame.accumulator)),
        }
    }

    fn finish(&self, outcome: Outcome<Value>) -> Outcome<Value> {
        match outcome {
            _ if self.is_cancelled() => {
                trace!("cancellation observed at completion");
                Err(Error::Cancelled)
            }
            Ok(value) => Ok(value),
            Err(error) => {
                debug!(%error, "effect failed");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::node::{erase, unerase};
    use rstest::rstest;

    fn pure(value: i32) -> Node<()> {
        Node::Pure(erase(value))
    }

    fn add(amount: i32) -> Continuation<()> {
        Box::new(move |value| pure(unerase::<i32>(value) + amount))
    }

    #[rstest]
    #[tokio::test]
    async fn test_bind_runs_continuation() {
        let node = Node::Bind(Child::new(pure(1)), add(41));
        let outcome = execute(node, Environment::default()).await;
        assert_eq!(outcome.map(unerase::<i32>), Ok(42));
    }

    #[rstest]
    #[tokio::test]
    async fn test_left_nested_chain_does_not_grow_native_stack() {
        let node = (0..200_000).fold(pure(0), |node, _| Node::Bind(Child::new(node), add(1)));
        let outcome = execute(node, Environment::default()).await;
        assert_eq!(outcome.map(unerase::<i32>), Ok(200_000));
    }

    #[rstest]
    #[tokio::test]
    async fn test_pre_cancelled_environment_never_evaluates() {
        let environment: Environment = Environment::default();
        environment.cancel();
        let node = Node::Sync(Box::new(|_: &Environment| -> Outcome<Value> {
            panic!("must not run")
        }));
        let outcome = execute(node, environment).await;
        assert!(matches!(outcome, Err(Error::Cancelled)));
    }

    #[rstest]
    #[tokio::test]
    async fn test_shield_is_balanced_after_cleanup() {
        let node = Node::Finalize {
            source: Child::new(pure(1)),
            finalizer: Child::new(pure(2)),
        };
        let mut engine = Engine {
            environment: Environment::default(),
            stack: SmallVec::new(),
            shield: 0,
        };
        let mut step = Step::Eval(node);
        let outcome = loop {
            step = match step {
                Step::Eval(node) => engine.eval(node),
                Step::Suspend(_) => unreachable!("no lifted nodes"),
                Step::Return(outcome) => match engine.stack.pop() {
                    Some(frame) => engine.unwind(frame, outcome),
                    None => break outcome,
                },
            };
        };
        assert_eq!(engine.shield, 0);
        assert_eq!(outcome.map(unerase::<i32>), Ok(1));
    }
}
