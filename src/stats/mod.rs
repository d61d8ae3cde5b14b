/// Numerical core: OLS, simple regression, ANCOVA and coefficient t tests.
///
/// Everything here works on plain slices and returns owned results; nothing
/// touches the filesystem.
pub mod ancova;
pub mod line;
pub mod ols;
pub mod ttest;
