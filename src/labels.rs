// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Class-name tables for detection models.

use std::collections::HashMap;

/// COCO category names indexed by the label id emitted by SSD-style detectors
/// (91 categories plus `background` at id 0).
pub const COCO_LABELS: [&str; 92] = [
    "background", "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train",
    "truck", "boat", "traffic light", "fire hydrant", "street sign", "stop sign",
    "parking meter", "bench", "bird", "cat", "dog", "horse", "sheep", "cow", "elephant",
    "bear", "zebra", "giraffe", "hat", "backpack", "umbrella", "shoe", "eye glasses",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "plate", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "mirror", "dining table", "window", "desk", "toilet",
    "door", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone", "microwave", "oven",
    "toaster", "sink", "refrigerator", "blender", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush", "hair brush",
];

/// Build a label id to name map from a static table.
#[must_use]
pub fn label_map(labels: &[&str]) -> HashMap<usize, String> {
    labels
        .iter()
        .enumerate()
        .map(|(id, name)| (id, (*name).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_labels() {
        assert_eq!(COCO_LABELS[0], "background");
        assert_eq!(COCO_LABELS[1], "person");
        assert_eq!(COCO_LABELS[3], "car");
        assert_eq!(COCO_LABELS[91], "hair brush");
    }

    #[test]
    fn test_label_map() {
        let map = label_map(&COCO_LABELS);
        assert_eq!(map.len(), COCO_LABELS.len());
        assert_eq!(map.get(&6).map(String::as_str), Some("bus"));
    }
}
