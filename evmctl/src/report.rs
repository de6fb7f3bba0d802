use error_stack::{Context, IntoReportCompat, Report};
use eyre::Report as EyreReport;

/// `change_context` for results coming out of cosmrs, whose errors are eyre reports
/// rather than error_stack contexts.
pub trait ResultCompatExt {
    type Ok;

    fn change_context<C>(self, context: C) -> Result<Self::Ok, Report<C>>
    where
        C: Context;
}

impl<T> ResultCompatExt for Result<T, EyreReport> {
    type Ok = T;

    fn change_context<C>(self, context: C) -> Result<T, Report<C>>
    where
        C: Context,
    {
        IntoReportCompat::into_report(self).map_err(|report| report.change_context(context))
    }
}

/// Wraps an error in a report of the error type it converts into, so `#[from]` variants can
/// be reported with `map_err(ErrorExt::into_report)`.
pub trait ErrorExt<Err>
where
    Self: Into<Err>,
    Err: Context,
{
    fn into_report(self) -> Report<Err> {
        Report::new(self.into())
    }
}

impl<T, Err> ErrorExt<Err> for T
where
    T: Into<Err>,
    Err: Context,
{
}
