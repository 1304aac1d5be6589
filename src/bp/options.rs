// Options of the loopy belief propagation run
#[derive(Clone, Debug)]
pub struct BpOptions {
    max_iterations: usize,      // the run stops once the iteration count exceeds this
    convergence_threshold: f64, // largest mean absolute change tolerated between iterations
    initial_message_value: f64, // entry value of the uniform message a variable starts from
}

impl Default for BpOptions {
    fn default() -> Self {
        BpOptions {
            max_iterations: 100,
            convergence_threshold: 1e-6,
            initial_message_value: 0.5,
        }
    }
}

impl BpOptions {
    pub fn set_max_iterations(&mut self, value: usize) -> &mut Self {
        self.max_iterations = value;
        self
    }

    pub fn set_convergence_threshold(&mut self, value: f64) -> &mut Self {
        self.convergence_threshold = value;
        self
    }

    pub fn set_initial_message_value(&mut self, value: f64) -> &mut Self {
        self.initial_message_value = value;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn convergence_threshold(&self) -> f64 {
        self.convergence_threshold
    }

    pub fn initial_message_value(&self) -> f64 {
        self.initial_message_value
    }
}
