mod compiler;
#[cfg(all(target_arch = "x86_64", unix))]
mod program;
