/// Generates one `#[test]` per scenario for a store and payload type.
#[macro_export]
macro_rules! tag_suite {
    ( $name:ident => $harness:expr, $object:ty ) => {
        $crate::tag_suite! { @expand $name => $harness, $object ;
            reads_and_writes_a_key_with_tags,
            deletes_a_key_if_tag_is_deleted,
            reads_a_key_if_another_tag_was_deleted,
            reads_and_writes_if_multiple_tags_given,
            deletes_a_key_if_one_of_tags_is_deleted,
            reads_and_writes_a_key_if_versioned_tag_given,
            reads_and_writes_a_key_if_timestamps_given_as_tags,
            reads_and_writes_a_key_if_objects_given_as_tags,
            reads_multiple_keys_with_tags_check,
            fetches_key_with_tag_check,
            fetches_untagged_key_immune_to_tag_deletion,
            repeated_reads_agree,
            overwrites_replace_tags,
        }
    };

    ( @expand $name:ident => $harness:expr, $object:ty ; $( $scenario:ident ),* $(,)? ) => {
        mod $name {
            $(
                #[test]
                fn $scenario() {
                    #[cfg(feature = "tracing")]
                    crate::shared::setup::tracing_init();

                    let harness = $harness;
                    harness.run(|cache| crate::shared::scenarios::$scenario::<_, $object>(cache));
                }
            )*
        }
    };
}
