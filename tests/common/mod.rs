#![allow(dead_code)]

use assetflow::fs::mock::MockFileSystem;

/// A small front-end source tree rooted at `"."`.
pub fn mock_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./src/index.html", "<html></html>");
    fs.add_file("./src/styles/main.css", "body {}");
    fs.add_file("./src/styles/_vars.css", ":root {}");
    fs.add_file("./src/styles/vendor/reset.css", "* {}");
    fs.add_file("./src/scripts/app.js", "let a = 1;");
    fs.add_file("./src/scripts/app.test.js", "test();");
    fs.add_file("./src/scripts/lib/util.js", "export {};");
    fs.add_file("./src/fonts/icons.woff", vec![0u8, 1, 2]);
    fs
}
