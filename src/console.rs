//! The user-facing side of the terminal: messages, input prompts, and
//! commands, all over stdin/stderr

use crate::display::{Event, RefreshReason};
use log::{debug, info, trace, warn};
use std::{
    collections::VecDeque,
    io::{self, BufRead},
    thread,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

/// A request for free-text input from the user
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InputBox {
    pub prompt: &'static str,
    pub placeholder: &'static str,
}

/// Everything the app needs to talk to the user
pub trait UserInterface: Send + Sync {
    fn show_info(&self, message: &str);

    fn show_warning(&self, message: &str);

    fn show_error(&self, message: &str);

    /// Ask the user for some text. Resolves to `None` if they didn't give
    /// any.
    fn input_box(&self, input: InputBox) -> oneshot::Receiver<Option<String>>;
}

/// Ask for input and wait for it. A dropped reply counts as no answer.
pub async fn ask(ui: &dyn UserInterface, input: InputBox) -> Option<String> {
    ui.input_box(input).await.ok().flatten()
}

/// A command typed at the terminal
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Change city, optionally with the new name given inline
    ChangeCity(Option<String>),
    Refresh,
    Quit,
}

impl Command {
    /// Parse a line of input. Returns `None` for blank lines, and an error
    /// message for anything unrecognized.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, Some(argument.trim())),
            None => (line, None),
        };
        let command = match command.to_lowercase().as_str() {
            "city" | "change-city" => Self::ChangeCity(
                argument.filter(|arg| !arg.is_empty()).map(String::from),
            ),
            "refresh" => Self::Refresh,
            "quit" | "exit" => Self::Quit,
            _ => {
                return Some(Err(format!(
                    "Unknown command `{command}`. \
                    Try `city [name]`, `refresh`, or `quit`"
                )))
            }
        };
        Some(Ok(command))
    }
}

impl From<Command> for Event {
    fn from(command: Command) -> Self {
        match command {
            Command::ChangeCity(city) => Self::ChangeCity(city),
            Command::Refresh => Self::Refresh(RefreshReason::Manual),
            Command::Quit => Self::Shutdown,
        }
    }
}

/// A prompt waiting on the next line of input
#[derive(Debug)]
struct PendingInput {
    input: InputBox,
    reply: oneshot::Sender<Option<String>>,
}

/// [UserInterface] on the terminal. Messages go to stderr, so stdout stays
/// clean for the status line. Input is routed by [Console::spawn_router].
#[derive(Clone, Debug)]
pub struct Console {
    prompts: mpsc::UnboundedSender<PendingInput>,
}

/// The receiving half of a [Console], which feeds the input router
#[derive(Debug)]
pub struct ConsoleInput {
    prompts: mpsc::UnboundedReceiver<PendingInput>,
}

impl Console {
    pub fn new() -> (Self, ConsoleInput) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { prompts: tx }, ConsoleInput { prompts: rx })
    }

    /// Spawn a thread to read stdin line by line. Reading stdin can't be
    /// done asynchronously, so it gets a thread to itself.
    pub fn read_stdin() -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("Stdin closed");
        });
        rx
    }

    /// Route lines of input. If a prompt is waiting, the next line answers
    /// it. Otherwise the line is parsed as a [Command] and forwarded to the
    /// display. Once input closes, every prompt is answered with nothing.
    pub fn spawn_router(
        input: ConsoleInput,
        mut lines: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<Event>,
    ) -> JoinHandle<()> {
        let ConsoleInput { mut prompts } = input;
        tokio::spawn(async move {
            let mut pending: VecDeque<PendingInput> = VecDeque::new();
            let mut input_open = true;
            loop {
                tokio::select! {
                    // Register prompts before consuming lines, so an answer
                    // never gets mistaken for a command
                    biased;

                    prompt = prompts.recv() => {
                        let Some(prompt) = prompt else { break };
                        if input_open {
                            // Only show the prompt once it's at the front
                            if pending.is_empty() {
                                print_prompt(prompt.input);
                            }
                            pending.push_back(prompt);
                        } else {
                            let _ = prompt.reply.send(None);
                        }
                    }
                    line = lines.recv(), if input_open => {
                        let Some(line) = line else {
                            input_open = false;
                            for prompt in pending.drain(..) {
                                let _ = prompt.reply.send(None);
                            }
                            continue;
                        };
                        trace!("Input line: {line:?}");

                        if let Some(prompt) = pending.pop_front() {
                            let answer = Some(line.trim().to_owned())
                                .filter(|answer| !answer.is_empty());
                            let _ = prompt.reply.send(answer);
                            if let Some(next) = pending.front() {
                                print_prompt(next.input);
                            }
                            continue;
                        }

                        match Command::parse(&line) {
                            None => {}
                            Some(Ok(command)) => {
                                info!("Received command {command:?}");
                                if events.send(command.into()).is_err() {
                                    break;
                                }
                            }
                            Some(Err(message)) => {
                                warn!("{message}");
                                eprintln!("warning: {message}");
                            }
                        }
                    }
                }
            }
            debug!("Input router stopped");
        })
    }
}

fn print_prompt(input: InputBox) {
    eprintln!("{} ({}):", input.prompt, input.placeholder);
}

impl UserInterface for Console {
    fn show_info(&self, message: &str) {
        eprintln!("info: {message}");
    }

    fn show_warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn input_box(&self, input: InputBox) -> oneshot::Receiver<Option<String>> {
        let (reply, rx) = oneshot::channel();
        // If the router is gone, the reply sender gets dropped with the
        // message and the receiver resolves to an error, i.e. no answer
        let _ = self.prompts.send(PendingInput { input, reply });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: InputBox = InputBox {
        prompt: "Enter your city for prayer times",
        placeholder: "e.g., Makkah, London, New York",
    };

    #[test]
    fn test_parse_command() {
        assert_eq!(Command::parse("   "), None);
        assert_eq!(
            Command::parse("city"),
            Some(Ok(Command::ChangeCity(None)))
        );
        assert_eq!(
            Command::parse("city  New York "),
            Some(Ok(Command::ChangeCity(Some("New York".into()))))
        );
        assert_eq!(
            Command::parse("change-city Cairo"),
            Some(Ok(Command::ChangeCity(Some("Cairo".into()))))
        );
        assert_eq!(Command::parse("REFRESH"), Some(Ok(Command::Refresh)));
        assert_eq!(Command::parse("exit"), Some(Ok(Command::Quit)));
        assert!(matches!(Command::parse("dance"), Some(Err(_))));
    }

    #[test]
    fn test_command_into_event() {
        assert!(matches!(
            Event::from(Command::Refresh),
            Event::Refresh(RefreshReason::Manual)
        ));
        assert!(matches!(Event::from(Command::Quit), Event::Shutdown));
        assert!(matches!(
            Event::from(Command::ChangeCity(Some("Oslo".into()))),
            Event::ChangeCity(Some(city)) if city == "Oslo"
        ));
    }

    #[tokio::test]
    async fn test_router_answers_prompt() {
        let (console, input) = Console::new();
        let (lines_tx, lines) = mpsc::unbounded_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let _router = Console::spawn_router(input, lines, events_tx);

        let answer = console.input_box(INPUT);
        // Give the router a chance to register the prompt before the line
        tokio::task::yield_now().await;
        lines_tx.send("  London ".into()).unwrap();
        assert_eq!(answer.await.unwrap(), Some("London".into()));

        // With no prompt waiting, lines are commands
        lines_tx.send("refresh".into()).unwrap();
        assert!(matches!(
            events.recv().await,
            Some(Event::Refresh(RefreshReason::Manual))
        ));
    }

    #[tokio::test]
    async fn test_router_blank_answer() {
        let (console, input) = Console::new();
        let (lines_tx, lines) = mpsc::unbounded_channel();
        let (events_tx, _events) = mpsc::unbounded_channel();
        let _router = Console::spawn_router(input, lines, events_tx);

        let answer = console.input_box(INPUT);
        tokio::task::yield_now().await;
        lines_tx.send("".into()).unwrap();
        assert_eq!(answer.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_router_input_closed() {
        let (console, input) = Console::new();
        let (lines_tx, lines) = mpsc::unbounded_channel::<String>();
        let (events_tx, _events) = mpsc::unbounded_channel();
        let _router = Console::spawn_router(input, lines, events_tx);

        let pending = console.input_box(INPUT);
        tokio::task::yield_now().await;
        drop(lines_tx);
        assert_eq!(pending.await.unwrap(), None);
        // Later prompts don't wait for input that will never come
        assert_eq!(ask(&console, INPUT).await, None);
    }
}
