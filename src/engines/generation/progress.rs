use super::evolution_engine::ProgressCallback;

/// Reports progress through the `log` facade.
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        log::debug!("Generation {} starting...", generation + 1);
    }

    fn on_population_evaluated(&mut self, generation: usize, population_size: usize) {
        log::debug!(
            "Generation {}: evaluated {} expressions",
            generation + 1,
            population_size
        );
    }

    fn on_generation_complete(&mut self, generation: usize, best_mse: f64, hof_size: usize) {
        log::info!(
            "Generation {}: best MSE = {:.6}, Hall of Fame size: {}",
            generation + 1,
            best_mse,
            hof_size
        );
    }
}

// For forwarding progress to a front end on another thread
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart(usize),
    PopulationEvaluated { generation: usize, population_size: usize },
    GenerationComplete { generation: usize, best_mse: f64, hof_size: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationStart(generation));
    }

    fn on_population_evaluated(&mut self, generation: usize, population_size: usize) {
        let _ = self.sender.send(ProgressMessage::PopulationEvaluated {
            generation,
            population_size,
        });
    }

    fn on_generation_complete(&mut self, generation: usize, best_mse: f64, hof_size: usize) {
        let _ = self.sender.send(ProgressMessage::GenerationComplete {
            generation,
            best_mse,
            hof_size,
        });
    }
}
