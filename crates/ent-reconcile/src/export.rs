use crate::EnterpriseLearner;

/// Fixed header of the missing-enterprise-enrollment report.
pub const EXPORT_HEADER: [&str; 8] = [
    "LMS User ID",
    "LMS Username",
    "Enterprise Customer Name",
    "EnterpriseCustomerUser Created",
    "Course ID",
    "Enrollment Created",
    "Enrollment Active",
    "Enrollment Mode",
];

/// Destination for exported rows (CSV file in production).
pub trait RowSink {
    type Error;

    fn write_header(&mut self, header: &[&str]) -> Result<(), Self::Error>;

    fn write_row(&mut self, row: &[String]) -> Result<(), Self::Error>;
}

/// One row per qualifying enrollment, identity columns repeated on each.
pub fn learner_rows(learner: &EnterpriseLearner, exclude_incidental: bool) -> Vec<Vec<String>> {
    let identity = learner.identity_fields();
    learner
        .filtered_enrollments(exclude_incidental)
        .into_iter()
        .map(|enrollment| {
            identity
                .iter()
                .cloned()
                .chain(enrollment.export_fields())
                .collect()
        })
        .collect()
}

/// Flatten learners into report rows, learners in iteration order.
pub fn export_rows<'a>(
    learners: impl IntoIterator<Item = &'a EnterpriseLearner>,
    exclude_incidental: bool,
) -> Vec<Vec<String>> {
    learners
        .into_iter()
        .flat_map(|l| learner_rows(l, exclude_incidental))
        .collect()
}

/// Write header + rows to `sink`. Returns the number of data rows written.
pub fn export_to<'a, S: RowSink>(
    sink: &mut S,
    learners: impl IntoIterator<Item = &'a EnterpriseLearner>,
    exclude_incidental: bool,
) -> Result<usize, S::Error> {
    sink.write_header(&EXPORT_HEADER)?;
    let mut written = 0;
    for learner in learners {
        for row in learner_rows(learner, exclude_incidental) {
            sink.write_row(&row)?;
            written += 1;
        }
    }
    Ok(written)
}
