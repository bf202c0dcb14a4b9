//! The top-level session: input state, the generator, and the event dispatcher.

use crate::encoder::SelectedFile;
use crate::image::ImageProvider;
use crate::orchestrator::{Admission, Generator, Outcome, Submission};
use crate::presenter::ViewState;
use crate::state::{PreviewRegistry, PromptState, UploadState};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A discrete user input.
#[derive(Debug, Clone)]
pub enum Event {
    /// The prompt text changed.
    SetPrompt(String),
    /// The user picked (or dropped) a file.
    SelectFile(SelectedFile),
    /// The user removed the reference image.
    RemoveImage,
    /// The user pressed generate.
    Submit,
}

/// What handling an event produced.
#[derive(Debug)]
pub enum Reaction {
    /// State was updated; nothing else to do.
    Updated,
    /// Something should be shown to the user right away (e.g. a bad file).
    Notify(String),
    /// A generation request was started in the background.
    ///
    /// Aborting the handle, or a panic inside the provider, ends the request
    /// with the unknown-error failure; the session can submit again.
    Started(JoinHandle<Submission>),
    /// The submit was rejected by validation; the outcome holds the message.
    Rejected,
    /// A request is already in flight.
    Ignored,
}

/// One user session.
///
/// Events are applied one at a time by [`Studio::handle`]; each handler
/// runs to completion. The only suspension point is the provider call,
/// which runs on a spawned task so the dispatcher never blocks on it.
pub struct Studio<P> {
    prompt: PromptState,
    upload: UploadState,
    generator: Arc<Generator<P>>,
}

impl<P: ImageProvider + 'static> Studio<P> {
    /// Creates a session around a provider.
    pub fn new(provider: P) -> Self {
        Self::with_previews(provider, PreviewRegistry::new())
    }

    /// Creates a session that allocates previews from `previews`.
    pub fn with_previews(provider: P, previews: PreviewRegistry) -> Self {
        Self {
            prompt: PromptState::new(),
            upload: UploadState::new(previews),
            generator: Arc::new(Generator::new(provider)),
        }
    }

    /// The prompt holder.
    pub fn prompt(&self) -> &PromptState {
        &self.prompt
    }

    /// The upload holder.
    pub fn upload(&self) -> &UploadState {
        &self.upload
    }

    /// The generator.
    pub fn generator(&self) -> &Generator<P> {
        &self.generator
    }

    /// Current outcome.
    pub fn outcome(&self) -> Outcome {
        self.generator.outcome()
    }

    /// Whether the generate button is enabled.
    pub fn can_submit(&self) -> bool {
        !self.generator.is_pending() && !self.prompt.get().is_empty()
    }

    /// Snapshot for the result panel.
    pub fn view(&self) -> ViewState {
        ViewState::from(&self.generator.outcome())
    }

    /// Applies one event.
    ///
    /// `Submit` spawns onto the current Tokio runtime and must be called
    /// from within one.
    pub fn handle(&self, event: Event) -> Reaction {
        match event {
            Event::SetPrompt(text) => {
                self.prompt.set(text);
                Reaction::Updated
            }
            Event::SelectFile(file) => match self.upload.select(&file) {
                Ok(()) => Reaction::Updated,
                Err(e) => {
                    tracing::warn!(file = %file.name, "could not use selected file: {e}");
                    Reaction::Notify(e.user_message())
                }
            },
            Event::RemoveImage => {
                self.upload.remove();
                Reaction::Updated
            }
            Event::Submit => self.submit(),
        }
    }

    fn submit(&self) -> Reaction {
        let prompt = self.prompt.get();
        let image = self.upload.image();

        // The request is a snapshot: later edits do not affect it.
        match self.generator.begin(&prompt, image.as_ref()) {
            Admission::Started(ticket) => {
                let generator = Arc::clone(&self.generator);
                Reaction::Started(tokio::spawn(async move { generator.run(ticket).await }))
            }
            Admission::Rejected => Reaction::Rejected,
            Admission::Ignored => Reaction::Ignored,
        }
    }
}
