//! Service layer for Autocast
//!
//! `AutocastService` wires the store, the content generator and the publish
//! gateway into the two cycle services and the scheduler that drives them.
//! All sub-services share the same `Arc<Database>` and [`EventBus`].
//!
//! - [`GenerationService`]: turns pending topics into posts
//! - [`PublishingService`]: publishes due posts and completes topics
//! - [`Scheduler`]: fires both cycles on their timers
//!
//! # Example
//!
//! ```no_run
//! use libautocast::service::AutocastService;
//! use libautocast::Config;
//!
//! # async fn example() -> libautocast::Result<()> {
//! let service = AutocastService::from_config(Config::load()?).await?;
//!
//! let mut events = service.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! service.scheduler().start()?;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod generation;
pub mod guard;
pub mod publishing;

pub use events::{CycleKind, Event, EventBus, EventReceiver};
pub use generation::{GenerationReport, GenerationService, TopicGeneration};
pub use publishing::{PublishReport, PublishingService};

use std::sync::Arc;

use crate::config::{Config, SchedulerConfig};
use crate::db::Database;
use crate::error::Result;
use crate::generator::{create_provider, ContentGenerator};
use crate::publisher::PublishGateway;
use crate::scheduler::Scheduler;

/// Result of one cycle entry
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome<T> {
    /// The same cycle was already running; nothing was done
    Skipped,
    Completed(T),
    /// The run could not start, e.g. the store was unreadable
    Failed(String),
}

impl<T> CycleOutcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, CycleOutcome::Skipped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            CycleOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }
}

/// Main service facade
pub struct AutocastService {
    db: Arc<Database>,
    generation: GenerationService,
    publishing: PublishingService,
    scheduler: Scheduler,
    event_bus: EventBus,
}

impl AutocastService {
    /// Build every component from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, the AI
    /// provider cannot be created, a publisher cannot be built, or the
    /// scheduler settings are invalid.
    pub async fn from_config(config: Config) -> Result<Self> {
        let db = Database::new(&config.database.path).await?;
        let generator = ContentGenerator::new(create_provider(&config.ai)?);
        let gateway = PublishGateway::from_config(&config)?;

        Self::with_components(db, generator, gateway, &config.scheduler)
    }

    /// Assemble the service from prebuilt parts
    ///
    /// Tests use this with a mock provider and mock publishers.
    pub fn with_components(
        db: Database,
        generator: ContentGenerator,
        gateway: PublishGateway,
        settings: &SchedulerConfig,
    ) -> Result<Self> {
        let db = Arc::new(db);
        let event_bus = EventBus::default();

        let generation = GenerationService::new(
            Arc::clone(&db),
            generator,
            event_bus.clone(),
            settings.require_approval,
        );
        let publishing = PublishingService::new(
            Arc::clone(&db),
            Arc::new(gateway),
            event_bus.clone(),
            settings.require_approval,
            settings.posts_per_day,
        );
        let scheduler = Scheduler::new(
            generation.clone(),
            publishing.clone(),
            settings.generation_interval()?,
            settings.publish_times()?,
        );

        Ok(Self {
            db,
            generation,
            publishing,
            scheduler,
            event_bus,
        })
    }

    /// Access the database directly
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn generation(&self) -> &GenerationService {
        &self.generation
    }

    pub fn publishing(&self) -> &PublishingService {
        &self.publishing
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Subscribe to cycle and post events
    ///
    /// Multiple subscribers are supported; each sees events emitted after it
    /// subscribed.
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }
}
