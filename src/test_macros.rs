/// Implements `quickcheck::Arbitrary` for a struct by generating each listed field.
///
/// Field types are inferred, see `qc_help` for how.
macro_rules! impl_arbitrary {
    ($type:ident, $($field:ident),*) => {
        #[cfg(test)]
        impl quickcheck::Arbitrary for $type {
            fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
                let _ = &gen;
                $type {
                    $(
                        $field: crate::test_macros::qc_help::Hack::new(0).arbitrary(gen),
                    )*
                }
            }
        }
    };
}
pub(crate) use impl_arbitrary;

#[cfg(test)]
pub(crate) fn arbitrary_bytes(gen: &mut quickcheck::Gen) -> [u8; 32] {
    <[u8; 32] as qc_help::Arbitrary>::arbitrary(gen)
}
