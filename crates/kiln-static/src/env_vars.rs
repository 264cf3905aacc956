/// Declares all environment variables used throughout `kiln` and its crates.
pub struct EnvVars;

impl EnvVars {
    /// Equivalent to the `ignore-unsupported-sandboxing` setting. If set to `true`, kiln will not
    /// warn when sandboxed execution is unavailable on the host.
    pub const KILN_IGNORE_UNSUPPORTED_SANDBOXING: &'static str =
        "KILN_IGNORE_UNSUPPORTED_SANDBOXING";

    /// Equivalent to the `verbose-failures` setting. If set to `true`, sandboxed strategies
    /// report the full command line of failing actions.
    pub const KILN_VERBOSE_FAILURES: &'static str = "KILN_VERBOSE_FAILURES";

    /// Overrides the path to the `linux-sandbox` helper binary used when probing for, and
    /// running under, the Linux namespace sandbox.
    pub const KILN_LINUX_SANDBOX: &'static str = "KILN_LINUX_SANDBOX";

    /// Set by the test driver to the test filter the runner should apply.
    ///
    /// Read by the test runner as its include filter.
    pub const TESTBRIDGE_TEST_ONLY: &'static str = "TESTBRIDGE_TEST_ONLY";

    /// Set by the test driver to the path the runner should write its XML report to.
    pub const XML_OUTPUT_FILE: &'static str = "XML_OUTPUT_FILE";
}
