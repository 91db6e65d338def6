#[cfg(asm_x86_64)]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(asm_x86_64)]
pub use cpuid_avx2::get as has_avx2;
