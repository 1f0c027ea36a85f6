#[cfg(feature = "python")]
fn configure_pyo3() {
    // Emits `Py_3_*`, `Py_GIL_DISABLED`, `PyPy`, ... for the interpreter resolved by
    // pyo3-build-config (honours `PYO3_PYTHON` and the other `PYO3_*` variables).
    pyo3_build_config::use_pyo3_cfgs();
}

#[cfg(not(feature = "python"))]
fn configure_pyo3() {
    // Keep `unexpected_cfgs` quiet for the interpreter cfgs referenced behind `feature = "python"`.
    println!("cargo:rustc-check-cfg=cfg(Py_3_13)");
    println!("cargo:rustc-check-cfg=cfg(Py_GIL_DISABLED)");
    println!("cargo:rustc-check-cfg=cfg(PyPy)");
    println!("cargo:rustc-check-cfg=cfg(GraalPy)");
}

fn main() {
    configure_pyo3();
    println!("cargo:rerun-if-changed=build.rs");
}
