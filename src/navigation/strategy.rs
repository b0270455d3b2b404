//! Pluggable pieces of the reactive loop

use crate::config::{GeneratorKind, NavigationParams};
use crate::navigation::candidates::{CandidateGenerator, DynamicWindowGenerator, HolonomicGenerator};
use crate::navigation::evaluation::{
    GoalEvaluator, HeadingProgressEvaluator, SafetyEvaluator, TrajectoryClearanceEvaluator,
};

/// Candidate generator plus the two evaluators
#[derive(Debug)]
pub struct ReactiveStrategy {
    pub generator: Box<dyn CandidateGenerator>,
    pub safety: Box<dyn SafetyEvaluator>,
    pub progress: Box<dyn GoalEvaluator>,
}

impl ReactiveStrategy {
    /// Build the strategy named by the parameters
    pub fn from_params(params: &NavigationParams) -> Self {
        let generator: Box<dyn CandidateGenerator> = match params.candidates.generator {
            GeneratorKind::DynamicWindow => Box::new(DynamicWindowGenerator::from_params(&params.candidates)),
            GeneratorKind::Holonomic => Box::new(HolonomicGenerator::from_params(&params.candidates)),
        };
        ReactiveStrategy {
            generator,
            safety: Box::new(TrajectoryClearanceEvaluator::from_params(&params.safety)),
            progress: Box::new(HeadingProgressEvaluator::from_params(&params.scoring)),
        }
    }

    pub fn with_generator<G: CandidateGenerator + 'static>(mut self, generator: G) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_safety<S: SafetyEvaluator + 'static>(mut self, safety: S) -> Self {
        self.safety = Box::new(safety);
        self
    }

    pub fn with_progress<P: GoalEvaluator + 'static>(mut self, progress: P) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        format!(
            "{} / {} / {}",
            self.generator.name(),
            self.safety.name(),
            self.progress.name()
        )
    }
}
