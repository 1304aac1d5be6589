use std::io::{self, Write};

use crate::{
    bp::loopy_bp::{BpOutcome, BpState},
    io::uai::vec_to_string,
};

// Receives the results of an inference run
pub trait ResultSink {
    fn report_marginals(&mut self, outcome: &BpOutcome) -> io::Result<()>;
    fn report_partition(&mut self, partition: f64) -> io::Result<()>;
}

/// Prints results as plain text: one line per variable holding its marginal's values in flat
/// order, preceded by a notice line if belief propagation stopped at the iteration cap.
pub struct MarginalWriter<W: Write> {
    writer: W,
    max_iterations: usize, // iteration cap quoted in the notice line
}

impl<W: Write> MarginalWriter<W> {
    pub fn new(writer: W, max_iterations: usize) -> Self {
        MarginalWriter {
            writer,
            max_iterations,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for MarginalWriter<W> {
    fn report_marginals(&mut self, outcome: &BpOutcome) -> io::Result<()> {
        if outcome.state == BpState::IterationCapReached {
            writeln!(
                self.writer,
                "Exceeded {} iterations... breaking and calculating marginals.",
                self.max_iterations
            )?;
        }
        for marginal in &outcome.marginals {
            writeln!(self.writer, "{}", vec_to_string(&marginal.values().to_vec()))?;
        }
        self.writer.flush()
    }

    fn report_partition(&mut self, partition: f64) -> io::Result<()> {
        writeln!(self.writer, "{}", partition)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::{domains::Domains, factor::Factor};

    fn outcome(state: BpState) -> BpOutcome {
        let domains = Domains::new(vec![2, 3]).unwrap();
        BpOutcome {
            marginals: vec![
                Factor::from_values(&[0], domains.clone(), vec![0.25, 0.75]).unwrap(),
                Factor::uniform(1, domains, 0.5),
            ],
            iterations: 3,
            state,
        }
    }

    #[test]
    fn one_line_per_variable() {
        let mut sink = MarginalWriter::new(Vec::new(), 100);
        sink.report_marginals(&outcome(BpState::Converged)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "0.25 0.75\n0.5 0.5 0.5\n");
    }

    #[test]
    fn notice_precedes_capped_marginals() {
        let mut sink = MarginalWriter::new(Vec::new(), 100);
        let capped = outcome(BpState::IterationCapReached);
        sink.report_marginals(&capped).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Exceeded 100 iterations... breaking and calculating marginals."
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn partition_on_its_own_line() {
        let mut sink = MarginalWriter::new(Vec::new(), 100);
        sink.report_partition(10.).unwrap();
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "10\n");
    }
}
