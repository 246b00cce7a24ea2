use wastir_ir::Feature;

macro_rules! features {
    ($($field:ident, $flag:literal, $default:literal;)*) => {
        // Proposals whose syntax is accepted by the parser. Using syntax of a disabled proposal is
        // reported as an error but parsing continues.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Features {
            $(pub $field: bool,)*
        }

        impl Default for Features {
            fn default() -> Self {
                Features {
                    $($field: $default,)*
                }
            }
        }

        impl Features {
            pub const NAMES: &'static [&'static str] = &[$($flag,)*];

            pub fn all() -> Self {
                Features {
                    $($field: true,)*
                }
            }

            pub fn none() -> Self {
                Features {
                    $($field: false,)*
                }
            }

            fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
                match name {
                    $($flag => Some(&mut self.$field),)*
                    _ => None,
                }
            }
        }
    };
}

features! {
    exceptions, "exceptions", false;
    mutable_globals, "mutable-globals", true;
    sat_float_to_int, "saturating-float-to-int", true;
    sign_extension, "sign-extension", true;
    simd, "simd", true;
    relaxed_simd, "relaxed-simd", false;
    threads, "threads", false;
    function_references, "function-references", false;
    multi_value, "multi-value", true;
    tail_call, "tail-call", false;
    bulk_memory, "bulk-memory", true;
    reference_types, "reference-types", true;
    annotations, "annotations", false;
    code_metadata, "code-metadata", false;
    memory64, "memory64", false;
    multi_memory, "multi-memory", false;
}

impl Features {
    // Returns false when the name is unknown
    pub fn enable(&mut self, name: &str) -> bool {
        self.set(name, true)
    }

    pub fn disable(&mut self, name: &str) -> bool {
        self.set(name, false)
    }

    fn set(&mut self, name: &str, enabled: bool) -> bool {
        match self.flag_mut(name) {
            Some(flag) => {
                *flag = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Mvp => true,
            Feature::SignExtension => self.sign_extension,
            Feature::SatFloatToInt => self.sat_float_to_int,
            Feature::Simd => self.simd,
            Feature::RelaxedSimd => self.relaxed_simd,
            Feature::Threads => self.threads,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub features: Features,
    // Reuse an existing type entry with the same signature instead of appending a new one for each
    // implicit type use
    pub dedup_func_types: bool,
}

impl ParseOptions {
    pub fn new(features: Features) -> Self {
        ParseOptions {
            features,
            dedup_func_types: false,
        }
    }

    pub fn reconcile_options(&self) -> crate::reconcile::ReconcileOptions {
        crate::reconcile::ReconcileOptions {
            dedup_func_types: self.dedup_func_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_features() {
        let f = Features::default();
        assert!(f.simd);
        assert!(f.bulk_memory);
        assert!(f.reference_types);
        assert!(!f.exceptions);
        assert!(!f.threads);
        assert!(!f.annotations);
        assert!(f.is_enabled(Feature::Mvp));
        assert!(f.is_enabled(Feature::Simd));
        assert!(!f.is_enabled(Feature::Threads));
    }

    #[test]
    fn toggle_by_name() {
        let mut f = Features::default();
        assert!(f.enable("tail-call"));
        assert!(f.tail_call);
        assert!(f.disable("simd"));
        assert!(!f.simd);
        assert!(!f.is_enabled(Feature::Simd));
        assert!(!f.enable("no-such-proposal"));
        assert_eq!(Features::NAMES.len(), 16);
    }

    #[test]
    fn all_and_none() {
        assert!(Features::all().threads);
        assert!(!Features::none().is_enabled(Feature::SignExtension));
        assert!(Features::none().is_enabled(Feature::Mvp));
    }
}
