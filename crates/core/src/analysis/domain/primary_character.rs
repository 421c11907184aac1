use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::PRIMARY_WIDTH_RATIO;

/// Whether one face dominates the frame.
///
/// The candidate is the *first* box in detector order, not the widest.
/// It dominates unless some other box is wider than
/// [`PRIMARY_WIDTH_RATIO`] of its width. An empty frame has no primary
/// character.
pub fn has_primary_character(boxes: &[BoundingBox]) -> bool {
    let Some((first, rest)) = boxes.split_first() else {
        return false;
    };
    let limit = first.width() * PRIMARY_WIDTH_RATIO;
    !rest.iter().any(|b| b.width() > limit)
}

/// `0`/`1` encoding used in the feature table.
pub fn primary_character_flag(boxes: &[BoundingBox]) -> u8 {
    u8::from(has_primary_character(boxes))
}
