#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Writes `<dir>/<name>.model3.json` with one texture page, two expressions and an
/// idle plus a tap motion.
pub fn write_model(dir: &Path, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir.join("expressions")).unwrap();
    std::fs::create_dir_all(dir.join("motions")).unwrap();

    let mut moc = b"MOC3".to_vec();
    moc.push(3);
    moc.extend_from_slice(&[0; 123]);
    std::fs::write(dir.join(format!("{name}.moc3")), moc).unwrap();

    image::RgbaImage::from_pixel(8, 16, image::Rgba([255, 255, 255, 255]))
        .save(dir.join("page.png"))
        .unwrap();

    std::fs::write(
        dir.join("expressions/happy.exp3.json"),
        r#"{"Type": "Live2D Expression", "FadeInTime": 0.0, "FadeOutTime": 0.0,
            "Parameters": [
                {"Id": "ParamMouthForm", "Value": 1.0, "Blend": "Overwrite"},
                {"Id": "ParamEyeLSmile", "Value": 1.0, "Blend": "Add"}
            ]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("expressions/sad.exp3.json"),
        r#"{"Type": "Live2D Expression", "FadeInTime": 0.0,
            "Parameters": [{"Id": "ParamMouthForm", "Value": -1.0, "Blend": "Overwrite"}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("motions/idle.motion3.json"),
        r#"{"Version": 3, "Meta": {"Duration": 4.0, "Fps": 30.0, "Loop": true},
            "Curves": [{"Target": "Parameter", "Id": "ParamAngleX",
                        "Segments": [0, 0, 0, 2, 15, 0, 4, 0]}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("motions/nod.motion3.json"),
        r#"{"Version": 3, "Meta": {"Duration": 1.0, "Fps": 30.0, "Loop": false},
            "Curves": [{"Target": "Parameter", "Id": "ParamAngleY",
                        "Segments": [0, 0, 2, 0.5, -20, 0, 1, 0]}]}"#,
    )
    .unwrap();

    let settings = format!(
        r#"{{
            "Version": 3,
            "FileReferences": {{
                "Moc": "{name}.moc3",
                "Textures": ["page.png"],
                "Expressions": [
                    {{"Name": "happy", "File": "expressions/happy.exp3.json"}},
                    {{"Name": "sad", "File": "expressions/sad.exp3.json"}}
                ],
                "Motions": {{
                    "Idle": [{{"File": "motions/idle.motion3.json", "FadeInTime": 0.0, "FadeOutTime": 0.0}}],
                    "TapBody": [{{"File": "motions/nod.motion3.json", "FadeInTime": 0.0, "FadeOutTime": 0.0}}]
                }}
            }},
            "Groups": [
                {{"Target": "Parameter", "Name": "LipSync", "Ids": ["ParamMouthOpenY"]}},
                {{"Target": "Parameter", "Name": "EyeBlink", "Ids": ["ParamEyeLOpen", "ParamEyeROpen"]}}
            ]
        }}"#
    );
    let path = dir.join(format!("{name}.model3.json"));
    std::fs::write(&path, settings).unwrap();
    path
}
