mod post_tests;
