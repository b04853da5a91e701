/// Hyperparameters and reporting switches of one `fit` call.
///
/// # Fields
///
/// - `learning_rate` - Step size applied to accumulated gradients (default 0.001)
/// - `batch_size` - Number of samples whose gradients are summed before each update (default 1)
/// - `epochs` - Number of passes over the training set (default 1)
/// - `validation_split` - Share of the samples held out for validation, in `[0, 1)` (default 0.0)
/// - `shuffle` - Whether the sample order is shuffled every epoch (default false)
/// - `regularization` - Optional factor `r`, every gradient `Δ` is applied as `Δ + r·Δ`
/// - `selective_update` - Optional per-sample output index; only that component of the loss
///   derivative is backpropagated for the sample
/// - `iteration_log` - Print a status line after every minibatch (default false)
/// - `epoch_log` - Print a status line after every epoch (default true)
/// - `show_progress` - Show a progress bar (default true)
/// - `seed` - Seed for the validation assignment and shuffling
///
/// # Example
/// ```rust
/// use rustynet::neural_network::TrainingOptions;
///
/// let options = TrainingOptions::new(0.01, 8, 20)
///     .with_shuffle(true)
///     .with_validation_split(0.2)
///     .with_seed(42);
/// assert_eq!(options.batch_size, 8);
/// assert!(options.epoch_log);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOptions {
    pub learning_rate: f32,
    pub batch_size: usize,
    pub epochs: usize,
    pub validation_split: f32,
    pub shuffle: bool,
    pub regularization: Option<f32>,
    pub selective_update: Option<Vec<usize>>,
    pub iteration_log: bool,
    pub epoch_log: bool,
    pub show_progress: bool,
    pub seed: Option<u64>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            learning_rate: 0.001,
            batch_size: 1,
            epochs: 1,
            validation_split: 0.0,
            shuffle: false,
            regularization: None,
            selective_update: None,
            iteration_log: false,
            epoch_log: true,
            show_progress: true,
            seed: None,
        }
    }
}

impl TrainingOptions {
    pub fn new(learning_rate: f32, batch_size: usize, epochs: usize) -> Self {
        TrainingOptions {
            learning_rate,
            batch_size,
            epochs,
            ..Default::default()
        }
    }

    pub fn with_validation_split(mut self, validation_split: f32) -> Self {
        self.validation_split = validation_split;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_regularization(mut self, factor: f32) -> Self {
        self.regularization = Some(factor);
        self
    }

    pub fn with_selective_update(mut self, mask: Vec<usize>) -> Self {
        self.selective_update = Some(mask);
        self
    }

    pub fn with_iteration_log(mut self, iteration_log: bool) -> Self {
        self.iteration_log = iteration_log;
        self
    }

    pub fn with_epoch_log(mut self, epoch_log: bool) -> Self {
        self.epoch_log = epoch_log;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Snapshot of a running `fit` call passed to the training hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingStatus {
    /// Current epoch, starting at 1 (0 before training starts)
    pub epoch: usize,
    pub epochs: usize,
    /// Number of parameter updates applied so far
    pub iteration: usize,
    /// Mean training loss of the current epoch so far
    pub train_loss: f32,
    /// Mean validation loss of the current epoch so far, `None` without validation samples
    pub validation_loss: Option<f32>,
    /// Human readable status line
    pub message: String,
}

impl TrainingStatus {
    pub(crate) fn new(
        epoch: usize,
        epochs: usize,
        iteration: usize,
        train_loss: f32,
        validation_loss: Option<f32>,
    ) -> Self {
        let mut message = format!(
            "Epoch {}/{} - iteration {} - loss: {:.6}",
            epoch, epochs, iteration, train_loss
        );
        if let Some(validation_loss) = validation_loss {
            message.push_str(&format!(" - val_loss: {:.6}", validation_loss));
        }
        TrainingStatus {
            epoch,
            epochs,
            iteration,
            train_loss,
            validation_loss,
            message,
        }
    }
}

type Hook<'a> = Box<dyn FnMut(&TrainingStatus) + 'a>;

/// Optional hooks invoked by `Sequential::fit_with_callbacks`.
///
/// # Example
/// ```rust
/// use rustynet::neural_network::TrainingCallbacks;
///
/// let mut losses = Vec::new();
/// let callbacks = TrainingCallbacks::new().on_epoch_end(|status| losses.push(status.train_loss));
/// drop(callbacks);
/// assert!(losses.is_empty());
/// ```
#[derive(Default)]
pub struct TrainingCallbacks<'a> {
    training_start: Option<Hook<'a>>,
    iteration_end: Option<Hook<'a>>,
    epoch_end: Option<Hook<'a>>,
    training_end: Option<Hook<'a>>,
}

impl<'a> TrainingCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once before the first epoch
    pub fn on_training_start(mut self, hook: impl FnMut(&TrainingStatus) + 'a) -> Self {
        self.training_start = Some(Box::new(hook));
        self
    }

    /// Called after every parameter update
    pub fn on_iteration_end(mut self, hook: impl FnMut(&TrainingStatus) + 'a) -> Self {
        self.iteration_end = Some(Box::new(hook));
        self
    }

    /// Called after every epoch
    pub fn on_epoch_end(mut self, hook: impl FnMut(&TrainingStatus) + 'a) -> Self {
        self.epoch_end = Some(Box::new(hook));
        self
    }

    /// Called once after the last epoch
    pub fn on_training_end(mut self, hook: impl FnMut(&TrainingStatus) + 'a) -> Self {
        self.training_end = Some(Box::new(hook));
        self
    }

    pub(crate) fn training_start(&mut self, status: &TrainingStatus) {
        if let Some(hook) = self.training_start.as_mut() {
            hook(status);
        }
    }

    pub(crate) fn iteration_end(&mut self, status: &TrainingStatus) {
        if let Some(hook) = self.iteration_end.as_mut() {
            hook(status);
        }
    }

    pub(crate) fn epoch_end(&mut self, status: &TrainingStatus) {
        if let Some(hook) = self.epoch_end.as_mut() {
            hook(status);
        }
    }

    pub(crate) fn training_end(&mut self, status: &TrainingStatus) {
        if let Some(hook) = self.training_end.as_mut() {
            hook(status);
        }
    }
}
