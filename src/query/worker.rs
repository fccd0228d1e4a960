//! Background search worker
//!
//! A dedicated thread receives [`WorkerCommand`]s over a channel, evaluates
//! each chunk on the rayon pool and streams [`WorkerResponse`]s back. The
//! orchestrator keeps reading the next batch while the worker evaluates the
//! previous one.

use crate::error::{Error, Result};
use crate::index::types::LineNo;
use crate::query::engine::{split_batch, Batch, SearchStrategy};
use crate::query::predicate::{CompiledPredicate, SearchPredicate, TermFlags};
use crate::query::protocol::{JobId, WorkerCommand, WorkerResponse};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Handle to a running search worker thread
pub struct SearchWorker {
    commands: Option<Sender<WorkerCommand>>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<()>>,
}

impl SearchWorker {
    /// Start the worker thread
    pub fn spawn() -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("loglens-search".to_string())
            .spawn(move || run(command_rx, response_tx))
            .map_err(|e| Error::WorkerUnavailable(e.to_string()))?;

        tracing::debug!("Search worker started");
        Ok(Self {
            commands: Some(command_tx),
            responses: response_rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, command: WorkerCommand) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or_else(|| Error::WorkerUnavailable("worker is shut down".to_string()))?
            .send(command)
            .map_err(|_| Error::WorkerUnavailable("worker thread exited".to_string()))
    }

    /// Next response, waiting for one if none is queued
    pub fn recv(&self) -> Result<WorkerResponse> {
        self.responses
            .recv()
            .map_err(|_| Error::WorkerUnavailable("worker thread exited".to_string()))
    }

    /// Next response if one is already queued
    pub fn try_recv(&self) -> Result<Option<WorkerResponse>> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(Error::WorkerUnavailable("worker thread exited".to_string()))
            }
        }
    }
}

impl SearchWorker {
    /// Close the command channel and wait for the thread to exit
    fn stop(&mut self) {
        // Closing the command channel ends the worker loop
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Search worker panicked");
            }
        }
    }

    /// Stop the thread while keeping the handle, as if the worker had died
    #[cfg(test)]
    pub(crate) fn shut_down(&mut self) {
        self.stop();
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(commands: Receiver<WorkerCommand>, responses: Sender<WorkerResponse>) {
    let mut jobs: FxHashMap<JobId, CompiledPredicate> = FxHashMap::default();

    for command in commands {
        let sent = match command {
            WorkerCommand::Init {
                job_id,
                term,
                whole_word,
                case_sensitive,
            } => {
                let predicate = SearchPredicate::Simple {
                    term,
                    flags: TermFlags {
                        whole_word,
                        case_sensitive,
                    },
                };
                start_job(&mut jobs, job_id, &predicate, &responses)
            }
            WorkerCommand::InitAdvanced { job_id, terms } => {
                start_job(&mut jobs, job_id, &SearchPredicate::Advanced { terms }, &responses)
            }
            WorkerCommand::Chunk {
                job_id,
                text,
                start_line,
                line_count,
            } => match jobs.get(&job_id) {
                Some(predicate) => {
                    let lines = split_batch(&text, line_count);
                    let found: Vec<LineNo> = lines
                        .par_iter()
                        .enumerate()
                        .filter(|(_, line)| predicate.is_match(line))
                        .map(|(i, _)| start_line + i)
                        .collect();
                    found.into_iter().try_for_each(|line_number| {
                        responses.send(WorkerResponse::Result { job_id, line_number })
                    })
                }
                None => Ok(()),
            },
            WorkerCommand::Done { job_id } => {
                jobs.remove(&job_id);
                responses.send(WorkerResponse::Complete { job_id })
            }
        };

        // The orchestrator is gone; nobody is listening
        if sent.is_err() {
            break;
        }
    }
}

fn start_job(
    jobs: &mut FxHashMap<JobId, CompiledPredicate>,
    job_id: JobId,
    predicate: &SearchPredicate,
    responses: &Sender<WorkerResponse>,
) -> std::result::Result<(), mpsc::SendError<WorkerResponse>> {
    match predicate.compile() {
        Ok(compiled) => {
            jobs.insert(job_id, compiled);
            Ok(())
        }
        Err(e) => responses.send(WorkerResponse::Failed {
            job_id,
            error: e.to_string(),
        }),
    }
}

/// Ships batches to a [`SearchWorker`] and gathers its streamed results.
///
/// Results are correlated by job id. Anything that arrives for a job that is
/// not pending (an abandoned earlier search) is dropped.
pub struct WorkerStrategy<'w> {
    worker: &'w SearchWorker,
    pending: FxHashMap<JobId, Vec<LineNo>>,
    failures: FxHashMap<JobId, String>,
    current: Option<JobId>,
}

impl<'w> WorkerStrategy<'w> {
    pub fn new(worker: &'w SearchWorker) -> Self {
        Self {
            worker,
            pending: FxHashMap::default(),
            failures: FxHashMap::default(),
            current: None,
        }
    }

    /// Route one response; returns true when it completes the current job
    fn accept(&mut self, response: WorkerResponse) -> bool {
        let job_id = response.job_id();
        if !self.pending.contains_key(&job_id) {
            tracing::trace!(job = job_id, "Ignoring response for stale job");
            return false;
        }

        match response {
            WorkerResponse::Result { line_number, .. } => {
                if let Some(lines) = self.pending.get_mut(&job_id) {
                    lines.push(line_number);
                }
                false
            }
            WorkerResponse::Failed { error, .. } => {
                self.failures.insert(job_id, error);
                false
            }
            WorkerResponse::Complete { .. } => self.current == Some(job_id),
        }
    }

    fn drain_ready(&mut self) -> Result<()> {
        while let Some(response) = self.worker.try_recv()? {
            self.accept(response);
        }
        Ok(())
    }
}

impl SearchStrategy for WorkerStrategy<'_> {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn begin(&mut self, job: JobId, predicate: &SearchPredicate) -> Result<()> {
        let command = match predicate {
            SearchPredicate::Simple { term, flags } => WorkerCommand::Init {
                job_id: job,
                term: term.clone(),
                whole_word: flags.whole_word,
                case_sensitive: flags.case_sensitive,
            },
            SearchPredicate::Advanced { terms } => WorkerCommand::InitAdvanced {
                job_id: job,
                terms: terms.clone(),
            },
        };

        self.pending.insert(job, Vec::new());
        self.current = Some(job);
        self.worker.send(command)
    }

    fn submit(&mut self, batch: Batch) -> Result<()> {
        let job_id = self
            .current
            .ok_or_else(|| Error::WorkerUnavailable("no job started".to_string()))?;
        self.worker.send(WorkerCommand::Chunk {
            job_id,
            text: batch.text,
            start_line: batch.start_line,
            line_count: batch.line_count,
        })?;
        self.drain_ready()
    }

    fn finish(&mut self) -> Result<Vec<LineNo>> {
        let job_id = self
            .current
            .ok_or_else(|| Error::WorkerUnavailable("no job started".to_string()))?;
        self.worker.send(WorkerCommand::Done { job_id })?;

        loop {
            let response = self.worker.recv()?;
            if self.accept(response) {
                break;
            }
        }

        self.current = None;
        let mut lines = self.pending.remove(&job_id).unwrap_or_default();
        if let Some(error) = self.failures.remove(&job_id) {
            return Err(Error::InvalidQuery(error));
        }
        // Already ascending while chunks are evaluated in submission order
        lines.sort_unstable();
        Ok(lines)
    }

    fn abandon(&mut self) {
        if let Some(job_id) = self.current.take() {
            self.pending.remove(&job_id);
            self.failures.remove(&job_id);
            // Let the worker drop its compiled predicate
            let _ = self.worker.send(WorkerCommand::Done { job_id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build::LineIndexBuilder;
    use crate::index::reader::ChunkReader;
    use crate::query::engine::{InlineStrategy, SearchEngine};
    use crate::query::predicate::SearchTerm;
    use crate::utils::{AbortFlag, NoProgress};
    use proptest::prelude::*;

    fn search_both(text: &str, predicate: &SearchPredicate, batch: usize) -> (Vec<LineNo>, Vec<LineNo>) {
        let reader = ChunkReader::from_bytes(text);
        let index = LineIndexBuilder::new(16)
            .build(&reader, &mut NoProgress, &AbortFlag::new())
            .unwrap();
        let engine = SearchEngine::new(&reader, &index).with_batch_size(batch);

        let inline = engine
            .search(predicate, &mut InlineStrategy::new(), &mut NoProgress, &AbortFlag::new())
            .unwrap();

        let worker = SearchWorker::spawn().unwrap();
        let parallel = engine
            .search(predicate, &mut WorkerStrategy::new(&worker), &mut NoProgress, &AbortFlag::new())
            .unwrap();

        (inline.as_slice().to_vec(), parallel.as_slice().to_vec())
    }

    #[test]
    fn test_worker_matches_inline() {
        let text: String = (0..2000)
            .map(|i| match i % 5 {
                0 => format!("ERROR request {} failed\r\n", i),
                1 => format!("warn slow {}\r", i),
                _ => format!("info ok {}\n", i),
            })
            .collect();
        let predicate = SearchPredicate::simple("error", TermFlags::default()).unwrap();
        let (inline, worker) = search_both(&text, &predicate, 128);
        assert_eq!(inline.len(), 400);
        assert_eq!(inline, worker);
    }

    #[test]
    fn test_worker_advanced_query() {
        let predicate = SearchPredicate::advanced(vec![
            SearchTerm::include("fail", TermFlags::default()),
            SearchTerm::exclude("ok", TermFlags::default()),
        ])
        .unwrap();
        let (inline, worker) = search_both("fail here\nfail ok\npassed", &predicate, 1);
        assert_eq!(inline, vec![0]);
        assert_eq!(worker, vec![0]);
    }

    #[test]
    fn test_stale_job_results_are_ignored() {
        let worker = SearchWorker::spawn().unwrap();
        let mut strategy = WorkerStrategy::new(&worker);
        let flags = TermFlags::default();

        strategy.begin(1, &SearchPredicate::simple("a", flags).unwrap()).unwrap();
        strategy
            .submit(Batch {
                start_line: 0,
                line_count: 3,
                text: "a\na\na\n".to_string(),
            })
            .unwrap();
        strategy.abandon();

        strategy.begin(2, &SearchPredicate::simple("b", flags).unwrap()).unwrap();
        strategy
            .submit(Batch {
                start_line: 0,
                line_count: 2,
                text: "a\nb\n".to_string(),
            })
            .unwrap();
        assert_eq!(strategy.finish().unwrap(), vec![1]);
    }

    #[test]
    fn test_worker_empty_advanced_matches_nothing() {
        let worker = SearchWorker::spawn().unwrap();
        let mut strategy = WorkerStrategy::new(&worker);
        // Bypasses the constructor checks; an empty advanced set matches nothing
        strategy
            .begin(5, &SearchPredicate::Advanced { terms: vec![] })
            .unwrap();
        strategy
            .submit(Batch {
                start_line: 0,
                line_count: 1,
                text: "anything".to_string(),
            })
            .unwrap();
        assert!(strategy.finish().unwrap().is_empty());
    }

    #[test]
    fn test_empty_terms_match_nothing_in_both_strategies() {
        let flags = TermFlags::default();
        let empty_simple = SearchPredicate::Simple {
            term: String::new(),
            flags,
        };
        let empty_include = SearchPredicate::Advanced {
            terms: vec![SearchTerm::include("", flags)],
        };
        for predicate in [empty_simple, empty_include] {
            let (inline, worker) = search_both("a\nb\nc\n", &predicate, 2);
            assert!(inline.is_empty(), "{:?} matched inline", predicate);
            assert!(worker.is_empty(), "{:?} matched on the worker", predicate);
        }
    }

    #[test]
    fn test_shut_down_worker_is_unavailable() {
        let mut worker = SearchWorker::spawn().unwrap();
        worker.shut_down();
        let mut strategy = WorkerStrategy::new(&worker);
        let result = strategy.begin(1, &SearchPredicate::simple("a", TermFlags::default()).unwrap());
        assert!(matches!(result, Err(Error::WorkerUnavailable(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_strategies_agree(
            lines in prop::collection::vec("[a-cA-C \\r\\n]{0,12}", 0..60),
            term in "[a-cA-C]{1,2}",
            whole_word in any::<bool>(),
            case_sensitive in any::<bool>(),
            batch in 1usize..20,
        ) {
            let text = lines.concat();
            let predicate = SearchPredicate::simple(term, TermFlags { whole_word, case_sensitive }).unwrap();
            let (inline, worker) = search_both(&text, &predicate, batch);
            prop_assert_eq!(inline, worker);
        }
    }
}
